//! Port for the subscription billing provider.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by billing adapters.
    pub enum PaymentGatewayError {
        /// Billing is not configured or the provider is unreachable.
        Unavailable { message: String } => "billing provider unavailable: {message}",
        /// Provider refused the request.
        Rejected { message: String } => "billing provider rejected request: {message}",
        /// Webhook signature did not verify.
        InvalidSignature { message: String } => "webhook signature invalid: {message}",
        /// Payload could not be decoded.
        Decode { message: String } => "billing payload could not be decoded: {message}",
    }
}

/// Parameters for a subscription checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted page the client is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSession {
    pub url: String,
}

/// Webhook events the service reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// A checkout finished; `user_id` comes from session metadata.
    CheckoutCompleted {
        user_id: Option<UserId>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    /// A subscription ended.
    SubscriptionDeleted { subscription_id: String },
    /// Any other event type; acknowledged without action.
    Ignored { kind: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a subscription checkout.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<RedirectSession, PaymentGatewayError>;

    /// Open the self-service billing portal for a customer.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<RedirectSession, PaymentGatewayError>;

    /// Verify a webhook signature and decode the event.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, PaymentGatewayError>;
}

/// Gateway used when billing is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPaymentGateway;

fn not_configured() -> PaymentGatewayError {
    PaymentGatewayError::unavailable("billing is not configured")
}

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutRequest,
    ) -> Result<RedirectSession, PaymentGatewayError> {
        Err(not_configured())
    }

    async fn create_portal_session(
        &self,
        _customer_id: &str,
        _return_url: &str,
    ) -> Result<RedirectSession, PaymentGatewayError> {
        Err(not_configured())
    }

    fn parse_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<BillingEvent, PaymentGatewayError> {
        Err(not_configured())
    }
}
