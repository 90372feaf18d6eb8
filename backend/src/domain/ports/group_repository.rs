//! Port for study groups and their members.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::groups::Group;

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Insert a group and enrol its owner in one transaction.
    ///
    /// Fails with [`RepositoryError::Duplicate`] when the invite code is
    /// taken.
    async fn create(&self, group: &Group) -> Result<(), RepositoryError>;

    /// Fetch a group by id.
    async fn find(&self, id: &Uuid) -> Result<Option<Group>, RepositoryError>;

    /// Fetch a group by invite code.
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Group>, RepositoryError>;

    /// Rename a group and return it, or `None` when absent.
    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Group>, RepositoryError>;

    /// Enrol a user. Returns `false` when they were already a member.
    async fn add_member(
        &self,
        group_id: &Uuid,
        user_id: &UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Groups the user owns or belongs to, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, RepositoryError>;

    /// Members of a group in joining order.
    async fn member_ids(&self, group_id: &Uuid) -> Result<Vec<UserId>, RepositoryError>;
}
