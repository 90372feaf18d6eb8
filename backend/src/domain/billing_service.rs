//! Subscription checkout, billing portal, and webhook handling.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ports::{
    BillingEvent, CheckoutRequest, PaymentGateway, PaymentGatewayError, ProfileRepository,
    RedirectSession,
};
use crate::domain::{Error, Viewer};

fn map_gateway_error(error: PaymentGatewayError) -> Error {
    match error {
        PaymentGatewayError::Unavailable { message } => {
            warn!(%message, "billing provider unavailable");
            Error::service_unavailable("billing is unavailable")
        }
        PaymentGatewayError::InvalidSignature { message } => {
            Error::invalid_request(format!("Webhook Error: {message}"))
        }
        PaymentGatewayError::Decode { message } => {
            Error::invalid_request(format!("Webhook Error: {message}"))
        }
        PaymentGatewayError::Rejected { message } => {
            warn!(%message, "billing provider rejected request");
            Error::internal("billing request failed")
        }
    }
}

/// Billing use-cases.
#[derive(Clone)]
pub struct BillingService {
    gateway: Arc<dyn PaymentGateway>,
    profiles: Arc<dyn ProfileRepository>,
    app_url: String,
}

impl BillingService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        profiles: Arc<dyn ProfileRepository>,
        app_url: impl Into<String>,
    ) -> Self {
        let app_url = app_url.into();
        Self {
            gateway,
            profiles,
            app_url: app_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Start a subscription checkout for the caller.
    pub async fn checkout(
        &self,
        viewer: &Viewer,
        return_url: Option<&str>,
    ) -> Result<RedirectSession, Error> {
        let request = CheckoutRequest {
            user_id: viewer.user_id,
            success_url: format!(
                "{}/subscription/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.app_url
            ),
            cancel_url: return_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map_or_else(|| format!("{}/", self.app_url), str::to_owned),
        };
        self.gateway
            .create_checkout_session(&request)
            .await
            .map_err(map_gateway_error)
    }

    /// Open the billing portal for the caller's customer record.
    pub async fn portal(&self, viewer: &Viewer) -> Result<RedirectSession, Error> {
        let customer_id = viewer
            .profile
            .as_ref()
            .and_then(|p| p.stripe_customer_id.as_deref())
            .ok_or_else(|| Error::invalid_request("No subscription found"))?;
        self.gateway
            .create_portal_session(customer_id, &format!("{}/mistap", self.app_url))
            .await
            .map_err(map_gateway_error)
    }

    /// Verify and apply a webhook.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<(), Error> {
        let event = self
            .gateway
            .parse_webhook(payload, signature)
            .map_err(map_gateway_error)?;
        match event {
            BillingEvent::CheckoutCompleted {
                user_id: Some(user_id),
                customer_id,
                subscription_id,
            } => {
                let updated = self
                    .profiles
                    .activate_subscription(&user_id, customer_id, subscription_id)
                    .await
                    .map_err(|err| {
                        warn!(error = %err, "subscription activation failed");
                        Error::internal("Database update failed")
                    })?;
                if updated {
                    info!(%user_id, "subscription activated");
                } else {
                    warn!(%user_id, "checkout completed for unknown profile");
                }
            }
            BillingEvent::CheckoutCompleted { user_id: None, .. } => {
                warn!("checkout completed without user metadata");
            }
            BillingEvent::SubscriptionDeleted { subscription_id } => {
                let cleared = self
                    .profiles
                    .cancel_subscription(&subscription_id)
                    .await
                    .map_err(|err| {
                        warn!(error = %err, "subscription cancellation failed");
                        Error::internal("Database update failed")
                    })?;
                info!(%subscription_id, cleared, "subscription cancelled");
            }
            BillingEvent::Ignored { kind } => {
                info!(%kind, "webhook event ignored");
            }
        }
        Ok(())
    }
}
