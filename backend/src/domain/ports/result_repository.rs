//! Port for quiz result persistence.

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::results::{NewQuizResult, QuizResult};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Insert a result or overwrite the row with the same
    /// `(user_id, test_key)`.
    ///
    /// An overwrite keeps the row id and creation time.
    async fn upsert(&self, result: &NewQuizResult) -> Result<QuizResult, RepositoryError>;

    /// All results of a user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<QuizResult>, RepositoryError>;
}
