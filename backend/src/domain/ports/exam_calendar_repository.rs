//! Port for qualification exam sessions and prefectural entrance exams.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::exam_calendar::{ExamSession, OfficialExam};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamCalendarRepository: Send + Sync {
    /// Active sessions of one exam, earliest exam day first.
    async fn sessions_for_exam(&self, slug: &str) -> Result<Vec<ExamSession>, RepositoryError>;

    /// One session by its exam and session slugs, active or not.
    async fn find_session(
        &self,
        slug: &str,
        session_slug: &str,
    ) -> Result<Option<ExamSession>, RepositoryError>;

    /// Every session, latest exam day first.
    async fn list_sessions(&self) -> Result<Vec<ExamSession>, RepositoryError>;

    /// Insert or replace a session by id.
    ///
    /// A second session with the same `(slug, session_slug)` is a
    /// [`RepositoryError::Duplicate`].
    async fn upsert_session(&self, session: &ExamSession) -> Result<ExamSession, RepositoryError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, id: &Uuid) -> Result<bool, RepositoryError>;

    /// Entrance exams of a school year, earliest first, optionally for one
    /// prefecture.
    async fn official_exams(
        &self,
        year: i32,
        prefecture_id: Option<i32>,
    ) -> Result<Vec<OfficialExam>, RepositoryError>;

    /// Insert or replace an entrance exam by id.
    async fn upsert_official_exam(
        &self,
        exam: &OfficialExam,
    ) -> Result<OfficialExam, RepositoryError>;

    /// Returns whether an exam was removed.
    async fn delete_official_exam(&self, id: &Uuid) -> Result<bool, RepositoryError>;
}
