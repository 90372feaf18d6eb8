//! Reqwest-backed Stripe billing adapter.
//!
//! Covers the three calls the service needs: subscription checkout, the
//! billing portal, and webhook verification. Webhooks are verified locally
//! against the `Stripe-Signature` header; no network call is made for them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::domain::UserId;
use crate::domain::ports::{
    BillingEvent, CheckoutRequest, PaymentGateway, PaymentGatewayError, RedirectSession,
};
use crate::outbound::http_support::status_message;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1/";
/// Oldest webhook timestamp accepted, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Credentials and plan for the Stripe account.
pub struct StripeSettings {
    pub secret_key: Zeroizing<String>,
    pub price_id: String,
    pub webhook_secret: Zeroizing<String>,
}

/// Stripe adapter implementing [`PaymentGateway`].
pub struct StripeHttpGateway {
    client: Client,
    api_base: Url,
    settings: StripeSettings,
    clock: Arc<dyn Clock>,
}

impl StripeHttpGateway {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        settings: StripeSettings,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Result<Self, PaymentGatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;
        let api_base = Url::parse(DEFAULT_STRIPE_API_BASE)
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;
        Ok(Self {
            client,
            api_base,
            settings,
            clock,
        })
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<RedirectSession, PaymentGatewayError> {
        let url = self
            .api_base
            .join(path)
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(self.settings.secret_key.as_str())
            .form(form)
            .send()
            .await
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| PaymentGatewayError::unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let session: SessionDto = serde_json::from_slice(&body)
            .map_err(|err| PaymentGatewayError::decode(err.to_string()))?;
        session
            .url
            .map(|url| RedirectSession { url })
            .ok_or_else(|| PaymentGatewayError::decode("session has no url"))
    }
}

#[derive(Debug, Deserialize)]
struct SessionDto {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventDto {
    #[serde(rename = "type")]
    kind: String,
    data: EventDataDto,
}

#[derive(Debug, Deserialize)]
struct EventDataDto {
    object: Value,
}

#[async_trait]
impl PaymentGateway for StripeHttpGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<RedirectSession, PaymentGatewayError> {
        let user_id = request.user_id.to_string();
        let form = [
            ("mode", "subscription"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", self.settings.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("metadata[userId]", user_id.as_str()),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
        ];
        let session = self.post_form("checkout/sessions", &form).await?;
        debug!(%user_id, "checkout session created");
        Ok(session)
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<RedirectSession, PaymentGatewayError> {
        let form = [("customer", customer_id), ("return_url", return_url)];
        self.post_form("billing_portal/sessions", &form).await
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, PaymentGatewayError> {
        verify_signature(
            payload,
            signature,
            self.settings.webhook_secret.as_bytes(),
            self.clock.utc().timestamp(),
        )?;
        let event: EventDto = serde_json::from_slice(payload)
            .map_err(|err| PaymentGatewayError::decode(err.to_string()))?;
        Ok(event_to_domain(event))
    }
}

/// Check a `t=…,v1=…` signature header against `payload`.
fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &[u8],
    now_secs: i64,
) -> Result<(), PaymentGatewayError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| {
        PaymentGatewayError::invalid_signature("Unable to extract timestamp and signatures from header")
    })?;
    if candidates.is_empty() {
        return Err(PaymentGatewayError::invalid_signature(
            "No signatures found with expected scheme",
        ));
    }
    if (now_secs - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentGatewayError::invalid_signature(
            "Timestamp outside the tolerance zone",
        ));
    }

    let matches = candidates.into_iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });
    if matches {
        Ok(())
    } else {
        Err(PaymentGatewayError::invalid_signature(
            "No signatures found matching the expected signature for payload",
        ))
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn event_to_domain(event: EventDto) -> BillingEvent {
    let object = event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => {
            let user_id = object
                .get("metadata")
                .and_then(|metadata| metadata.get("userId"))
                .and_then(Value::as_str)
                .and_then(|raw| match UserId::new(raw) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!(error = %err, "checkout metadata carries an invalid user id");
                        None
                    }
                });
            BillingEvent::CheckoutCompleted {
                user_id,
                customer_id: string_field(&object, "customer"),
                subscription_id: string_field(&object, "subscription"),
            }
        }
        "customer.subscription.deleted" => match string_field(&object, "id") {
            Some(subscription_id) => BillingEvent::SubscriptionDeleted { subscription_id },
            None => BillingEvent::Ignored { kind: event.kind },
        },
        _ => BillingEvent::Ignored { kind: event.kind },
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let message = status_message(status, body);
    if status.is_client_error() {
        PaymentGatewayError::rejected(message)
    } else {
        PaymentGatewayError::unavailable(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const SECRET: &[u8] = b"whsec_test";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET).expect("hmac key");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[rstest]
    fn accepts_a_fresh_valid_signature() {
        let payload = br#"{"type":"ping"}"#;
        let header = sign(payload, 1_700_000_000);
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_100).is_ok());
    }

    #[rstest]
    #[case::tampered(br#"{"type":"pong"}"#.as_slice(), 1_700_000_000)]
    #[case::stale(br#"{"type":"ping"}"#.as_slice(), 1_699_999_000)]
    fn rejects_bad_signatures(#[case] payload: &[u8], #[case] signed_at: i64) {
        let header = sign(br#"{"type":"ping"}"#, signed_at);
        let error = verify_signature(payload, &header, SECRET, 1_700_000_000)
            .expect_err("signature rejected");
        assert!(matches!(error, PaymentGatewayError::InvalidSignature { .. }));
    }

    #[rstest]
    fn rejects_header_without_timestamp() {
        let error = verify_signature(b"{}", "v1=abcd", SECRET, 0).expect_err("no timestamp");
        assert!(matches!(error, PaymentGatewayError::InvalidSignature { .. }));
    }

    #[rstest]
    fn decodes_completed_checkout() {
        let user_id = UserId::random();
        let event: EventDto = serde_json::from_value(json!({
            "type": "checkout.session.completed",
            "data": {"object": {
                "metadata": {"userId": user_id.to_string()},
                "customer": "cus_1",
                "subscription": "sub_1"
            }}
        }))
        .expect("event decodes");

        assert_eq!(
            event_to_domain(event),
            BillingEvent::CheckoutCompleted {
                user_id: Some(user_id),
                customer_id: Some("cus_1".to_owned()),
                subscription_id: Some("sub_1".to_owned()),
            }
        );
    }

    #[rstest]
    fn other_events_are_ignored() {
        let event: EventDto = serde_json::from_value(json!({
            "type": "invoice.paid",
            "data": {"object": {}}
        }))
        .expect("event decodes");

        assert_eq!(
            event_to_domain(event),
            BillingEvent::Ignored {
                kind: "invoice.paid".to_owned()
            }
        );
    }
}
