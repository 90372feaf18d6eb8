//! Port for community posts.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::community::{CommunityPost, ThreadSummary};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// Thread starters, newest first, with reply counts.
    async fn list_threads(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ThreadSummary>, RepositoryError>;

    /// Fetch one post.
    async fn find(&self, id: &Uuid) -> Result<Option<CommunityPost>, RepositoryError>;

    /// Replies to a thread, oldest first.
    async fn replies(&self, parent_id: &Uuid) -> Result<Vec<CommunityPost>, RepositoryError>;

    /// Insert a post.
    async fn create(&self, post: &CommunityPost) -> Result<(), RepositoryError>;

    /// Delete a post and its replies. Returns `false` when absent.
    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError>;
}
