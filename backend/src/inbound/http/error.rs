//! HTTP mapping for domain errors.
//!
//! Every failure leaves the service as the JSON envelope
//! `{code, message, details, traceId}` with the status derived from `code`.
//! Internal errors are redacted. Quota refusals also carry `Retry-After`,
//! computed from the limiter's `resetAt`, so clients can schedule a retry.

use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if error.code() != ErrorCode::InternalError {
        return error.clone();
    }
    let redacted = Error::internal("Internal server error");
    match error.trace_id() {
        Some(id) => redacted.with_trace_id(id.to_owned()),
        None => redacted,
    }
}

/// Whole seconds until `details.resetAt`, at least one.
fn retry_after_secs(error: &Error, now: DateTime<Utc>) -> Option<i64> {
    let reset_at = error
        .details()?
        .get("resetAt")?
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())?;
    let remaining = reset_at.with_timezone(&Utc) - now;
    Some(remaining.num_seconds().max(1))
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        if self.code() == ErrorCode::TooManyRequests {
            if let Some(secs) = retry_after_secs(self, Utc::now()) {
                builder.insert_header((header::RETRY_AFTER, HeaderValue::from(secs)));
            }
        }
        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests;
