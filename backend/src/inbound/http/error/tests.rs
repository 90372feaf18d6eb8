//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case::invalid(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case::unauthorized(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case::forbidden(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case::not_found(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case::conflict(Error::conflict("taken"), StatusCode::CONFLICT)]
#[case::quota(Error::too_many_requests("slow down"), StatusCode::TOO_MANY_REQUESTS)]
#[case::unavailable(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case::internal(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn response_body(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error JSON");
    (status, header, body)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(expected_trace_id: String) {
    let error = Error::internal("database password is hunter2")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"secret": "x"}));

    let (status, header, body) = response_body(&error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["traceId"], TRACE_ID);
    assert!(body.get("details").is_none());
}

#[rstest]
#[actix_web::test]
async fn validation_errors_keep_their_details(expected_trace_id: String) {
    let error = Error::invalid_request("images must hold 1 or 2 items")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"field": "images", "code": "out_of_range"}));

    let (status, _, body) = response_body(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], "images");
}

#[rstest]
#[actix_web::test]
async fn quota_errors_keep_their_localised_message() {
    let error = Error::too_many_requests("本日の利用回数を超えました。");

    let (status, header, body) = response_body(&error).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(header.is_none());
    assert_eq!(body["message"], "本日の利用回数を超えました。");
}

#[test]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}

#[rstest]
#[case::ahead("2026-04-01T00:01:30Z", Some(90))]
#[case::elapsed("2026-03-31T23:59:00Z", Some(1))]
#[case::garbage("tomorrow", None)]
fn retry_after_counts_down_to_the_reset(#[case] reset_at: &str, #[case] expected: Option<i64>) {
    let now = DateTime::parse_from_rfc3339("2026-04-01T00:00:00Z")
        .expect("fixed instant")
        .with_timezone(&Utc);
    let error = Error::too_many_requests("slow down").with_details(json!({"resetAt": reset_at}));
    assert_eq!(retry_after_secs(&error, now), expected);
}

#[actix_web::test]
async fn quota_refusals_advertise_retry_after() {
    let reset_at = (Utc::now() + chrono::Duration::hours(2)).to_rfc3339();
    let error = Error::too_many_requests("slow down").with_details(json!({"resetAt": reset_at}));

    let response = ResponseError::error_response(&error);

    let secs: i64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("numeric Retry-After");
    assert!((7_000..=7_200).contains(&secs));
}
