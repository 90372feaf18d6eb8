//! In-memory identity provider.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{AuthGateway, AuthGatewayError, AuthUser};

use super::lock;

#[derive(Debug, Default)]
struct Identities {
    users: HashMap<UserId, Option<String>>,
    tokens: HashMap<String, UserId>,
}

/// Accounts and opaque access tokens held in memory.
///
/// Tokens are minted with [`InMemoryAuthGateway::issue_token`]; integration
/// tests use it to sign callers in without a real provider.
#[derive(Debug, Default)]
pub struct InMemoryAuthGateway {
    identities: Mutex<Identities>,
}

impl InMemoryAuthGateway {
    /// Register `user` (if new) and return a fresh token for it.
    pub fn issue_token(&self, user: &AuthUser) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut identities = lock(&self.identities);
        identities
            .users
            .entry(user.id)
            .or_insert_with(|| user.email.clone());
        identities.tokens.insert(token.clone(), user.id);
        token
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn verify_token(&self, token: &str) -> Result<Option<AuthUser>, AuthGatewayError> {
        let identities = lock(&self.identities);
        Ok(identities.tokens.get(token).and_then(|id| {
            identities.users.get(id).map(|email| AuthUser {
                id: *id,
                email: email.clone(),
            })
        }))
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthGatewayError> {
        if password.is_empty() {
            return Err(AuthGatewayError::rejected("password must not be empty"));
        }
        let mut identities = lock(&self.identities);
        if identities
            .users
            .values()
            .any(|existing| existing.as_deref() == Some(email))
        {
            return Err(AuthGatewayError::duplicate(email));
        }
        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.to_owned()),
        };
        identities.users.insert(user.id, user.email.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), AuthGatewayError> {
        let mut identities = lock(&self.identities);
        identities.users.remove(id);
        identities.tokens.retain(|_, owner| owner != id);
        Ok(())
    }
}
