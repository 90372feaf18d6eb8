//! Subscription billing endpoints.
//!
//! ```text
//! POST /api/checkout {"returnUrl":"https://mistap.jp/mistap"}
//! POST /api/portal
//! POST /api/webhooks/stripe   (raw body, Stripe-Signature header)
//! GET  /api/webhooks/stripe
//! ```

use actix_web::{HttpRequest, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::Error;
use crate::domain::ports::RedirectSession;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Body for `POST /api/checkout`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Where to send the user if they cancel.
    pub return_url: Option<String>,
}

/// A hosted billing page to redirect to.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RedirectDto {
    pub url: String,
}

impl From<RedirectSession> for RedirectDto {
    fn from(session: RedirectSession) -> Self {
        Self { url: session.url }
    }
}

/// Start a subscription checkout.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutBody,
    responses(
        (status = 200, description = "Checkout page", body = RedirectDto),
        (status = 401, description = "Login required", body = Error),
        (status = 503, description = "Billing unavailable", body = Error)
    ),
    tags = ["billing"],
    operation_id = "createCheckout"
)]
#[post("/checkout")]
pub async fn checkout(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: Option<web::Json<CheckoutBody>>,
) -> ApiResult<web::Json<RedirectDto>> {
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let session = state
        .billing
        .checkout(&viewer.0, body.return_url.as_deref())
        .await?;
    Ok(web::Json(session.into()))
}

/// Open the self-service billing portal.
#[utoipa::path(
    post,
    path = "/api/portal",
    responses(
        (status = 200, description = "Portal page", body = RedirectDto),
        (status = 400, description = "No subscription", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["billing"],
    operation_id = "createPortal"
)]
#[post("/portal")]
pub async fn portal(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<RedirectDto>> {
    let session = state.billing.portal(&viewer.0).await?;
    Ok(web::Json(session.into()))
}

/// Receive a signed billing event.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event applied"),
        (status = 400, description = "Missing or invalid signature", body = Error)
    ),
    tags = ["billing"],
    operation_id = "stripeWebhook",
    security([])
)]
#[post("/webhooks/stripe")]
pub async fn stripe_webhook(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<Value>> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::invalid_request("Missing stripe-signature header"))?;
    state.billing.handle_webhook(&body, signature).await?;
    Ok(web::Json(json!({ "received": true })))
}

/// Liveness check for the webhook route.
#[utoipa::path(
    get,
    path = "/api/webhooks/stripe",
    responses((status = 200, description = "Webhook route is up")),
    tags = ["billing"],
    operation_id = "stripeWebhookStatus",
    security([])
)]
#[get("/webhooks/stripe")]
pub async fn stripe_webhook_status() -> web::Json<Value> {
    web::Json(json!({ "status": "active" }))
}
