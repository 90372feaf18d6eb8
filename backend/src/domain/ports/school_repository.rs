//! Ports for school progress data.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::school::{DailyLog, OneOffTask, Subject, TestRecord, Workbook};

use super::RepositoryError;

/// Subject catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// All subjects ordered by id.
    async fn list(&self) -> Result<Vec<Subject>, RepositoryError>;
}

/// Workbooks, daily logs, tasks, and school test records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchoolRepository: Send + Sync {
    /// A student's workbooks, newest first.
    async fn list_workbooks(&self, student_id: &UserId) -> Result<Vec<Workbook>, RepositoryError>;

    /// Insert a workbook.
    async fn create_workbook(&self, workbook: &Workbook) -> Result<(), RepositoryError>;

    /// Set the current page of a student's own workbook.
    ///
    /// Returns `None` when the workbook does not exist or belongs to someone
    /// else.
    async fn set_workbook_page(
        &self,
        id: &Uuid,
        student_id: &UserId,
        page: i32,
    ) -> Result<Option<Workbook>, RepositoryError>;

    /// Insert or replace the log for `(student, subject, date)`.
    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<DailyLog, RepositoryError>;

    /// Latest log date per student. Students without logs are absent.
    async fn latest_log_dates(
        &self,
        student_ids: &[UserId],
    ) -> Result<HashMap<UserId, NaiveDate>, RepositoryError>;

    /// Logs marked `forgot` on or after `since`.
    async fn forgot_logs_since(
        &self,
        student_ids: &[UserId],
        since: NaiveDate,
    ) -> Result<Vec<DailyLog>, RepositoryError>;

    /// A student's tasks: open first, then by deadline.
    async fn list_tasks(&self, student_id: &UserId) -> Result<Vec<OneOffTask>, RepositoryError>;

    /// Insert a task.
    async fn create_task(&self, task: &OneOffTask) -> Result<(), RepositoryError>;

    /// Mark a student's own task complete. Returns `None` when absent.
    async fn complete_task(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<Option<OneOffTask>, RepositoryError>;

    /// A student's test records, oldest test first.
    async fn list_test_records(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<TestRecord>, RepositoryError>;

    /// Insert a test record.
    async fn create_test_record(&self, record: &TestRecord) -> Result<(), RepositoryError>;

    /// Delete a student's own test record. Returns whether a row went away.
    async fn delete_test_record(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<bool, RepositoryError>;
}
