//! Port for site notices.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::announcements::{Announcement, AnnouncementPatch};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// Notices visible at `now`, newest first.
    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>, RepositoryError>;

    /// Every notice, newest first.
    async fn list_all(&self) -> Result<Vec<Announcement>, RepositoryError>;

    /// Insert a notice.
    async fn create(&self, announcement: &Announcement) -> Result<(), RepositoryError>;

    /// Patch a notice and return it, or `None` when absent.
    async fn update(
        &self,
        id: &Uuid,
        patch: &AnnouncementPatch,
    ) -> Result<Option<Announcement>, RepositoryError>;

    /// Delete a notice. Returns `false` when absent.
    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError>;
}
