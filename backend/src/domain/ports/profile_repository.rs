//! Port for profile persistence.
//!
//! Profiles share their identifier with the auth user. Counter updates are
//! single statements so concurrent requests never lose increments.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{LoginStreak, Profile, ProfileUpdate, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile by user id.
    async fn find(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Fetch a profile by its student login id.
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Profile>, RepositoryError>;

    /// Fetch every profile whose id is listed. Unknown ids are skipped.
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError>;

    /// Insert a new profile.
    ///
    /// Fails with [`RepositoryError::Duplicate`] when the id or login id is
    /// taken.
    async fn insert(&self, profile: &Profile) -> Result<(), RepositoryError>;

    /// Apply an edit and return the stored profile, or `None` when absent.
    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, RepositoryError>;

    /// Add one to the writing-check counter.
    async fn increment_writing_checks(&self, id: &UserId) -> Result<(), RepositoryError>;

    /// Add one to the quiz counter.
    async fn increment_test_count(&self, id: &UserId) -> Result<(), RepositoryError>;

    /// Store a login streak.
    async fn record_login(
        &self,
        id: &UserId,
        streak: &LoginStreak,
    ) -> Result<(), RepositoryError>;

    /// Mark a user as Pro with their billing identifiers.
    ///
    /// Returns `false` when no profile matched.
    async fn activate_subscription(
        &self,
        id: &UserId,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Result<bool, RepositoryError>;

    /// Clear Pro for every profile holding the subscription.
    ///
    /// Returns the number of profiles changed.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<u64, RepositoryError>;

    /// Students of a cram school ordered by name.
    async fn list_students(&self, cram_school_id: &Uuid) -> Result<Vec<Profile>, RepositoryError>;
}
