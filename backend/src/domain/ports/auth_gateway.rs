//! Port for the hosted identity provider.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity adapters.
    pub enum AuthGatewayError {
        /// Provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
        /// Provider refused the request.
        Rejected { message: String } => "identity provider rejected request: {message}",
        /// The email is already registered.
        Duplicate { message: String } => "identity already exists: {message}",
    }
}

/// Identity resolved from an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Resolve an access token. Unknown or expired tokens yield `None`.
    async fn verify_token(&self, token: &str) -> Result<Option<AuthUser>, AuthGatewayError>;

    /// Create a confirmed user with a password.
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthGatewayError>;

    /// Delete a user.
    async fn delete_user(&self, id: &UserId) -> Result<(), AuthGatewayError>;
}

/// Gateway used when no provider is configured: every caller is a guest and
/// account creation is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuthGateway;

#[async_trait]
impl AuthGateway for FixtureAuthGateway {
    async fn verify_token(&self, _token: &str) -> Result<Option<AuthUser>, AuthGatewayError> {
        Ok(None)
    }

    async fn create_user(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthUser, AuthGatewayError> {
        Err(AuthGatewayError::unavailable("identity provider is not configured"))
    }

    async fn delete_user(&self, _id: &UserId) -> Result<(), AuthGatewayError> {
        Ok(())
    }
}
