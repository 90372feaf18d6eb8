//! Supabase Auth adapter.
//!
//! Access tokens are resolved with `GET /auth/v1/user`; account management
//! uses the admin endpoints with the service-role key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::UserId;
use crate::domain::ports::{AuthGateway, AuthGatewayError, AuthUser};
use crate::outbound::http_support::status_message;

/// Identity adapter implementing [`AuthGateway`] over the Supabase REST API.
pub struct SupabaseAuthGateway {
    client: Client,
    base_url: Url,
    anon_key: Zeroizing<String>,
    service_role_key: Option<Zeroizing<String>>,
}

impl SupabaseAuthGateway {
    /// Build an adapter rooted at the project URL.
    ///
    /// Without a service-role key, account creation and deletion are refused.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        anon_key: Zeroizing<String>,
        service_role_key: Option<Zeroizing<String>>,
        timeout: Duration,
    ) -> Result<Self, AuthGatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthGatewayError::unavailable(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            anon_key,
            service_role_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthGatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| AuthGatewayError::unavailable(format!("invalid auth url: {err}")))
    }

    fn admin_key(&self) -> Result<&str, AuthGatewayError> {
        self.service_role_key
            .as_ref()
            .map(|key| key.as_str())
            .ok_or_else(|| AuthGatewayError::unavailable("service role key is not configured"))
    }
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: String,
    email: Option<String>,
}

impl UserDto {
    fn into_domain(self) -> Result<AuthUser, AuthGatewayError> {
        let id = UserId::new(&self.id)
            .map_err(|err| AuthGatewayError::rejected(format!("provider user id: {err}")))?;
        Ok(AuthUser {
            id,
            email: self.email,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateUserDto<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

#[async_trait]
impl AuthGateway for SupabaseAuthGateway {
    async fn verify_token(&self, token: &str) -> Result<Option<AuthUser>, AuthGatewayError> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let user: UserDto = serde_json::from_slice(&body)
            .map_err(|err| AuthGatewayError::rejected(format!("user payload: {err}")))?;
        user.into_domain().map(Some)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthGatewayError> {
        let key = self.admin_key()?;
        let response = self
            .client
            .post(self.endpoint("auth/v1/admin/users")?)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&CreateUserDto {
                email,
                password,
                email_confirm: true,
            })
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let user: UserDto = serde_json::from_slice(&body)
            .map_err(|err| AuthGatewayError::rejected(format!("user payload: {err}")))?;
        let user = user.into_domain()?;
        debug!(user_id = %user.id, "identity created");
        Ok(user)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), AuthGatewayError> {
        let key = self.admin_key()?;
        let response = self
            .client
            .delete(self.endpoint(&format!("auth/v1/admin/users/{id}"))?)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> AuthGatewayError {
    AuthGatewayError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AuthGatewayError {
    let message = status_message(status, body);
    let already_registered = String::from_utf8_lossy(body)
        .to_ascii_lowercase()
        .contains("already");
    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY if already_registered => {
            AuthGatewayError::duplicate(message)
        }
        StatusCode::CONFLICT => AuthGatewayError::duplicate(message),
        _ if status.is_client_error() => AuthGatewayError::rejected(message),
        _ => AuthGatewayError::unavailable(message),
    }
}
