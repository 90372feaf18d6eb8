//! Student progress use-cases and teacher alerts.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{ProfileRepository, SchoolRepository, SubjectRepository};
use crate::domain::school::{
    DailyLog, OneOffTask, SchoolValidationError, StudentAlert, Subject, SubjectScores,
    SubmissionStatus, TaskType, TestRecord, Workbook, alert_window_start, build_alerts,
    validate_daily_log, validate_page, validate_test_record, validate_title,
};
use crate::domain::{Error, UserId, Viewer, tokyo_date};

fn map_validation_error(field: &str, error: &SchoolValidationError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

/// Input for a new workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkbook {
    pub subject_id: i32,
    pub title: String,
    pub target_page: i32,
    pub deadline: Option<NaiveDate>,
}

/// Input for a daily log. The date defaults to today in Asia/Tokyo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLogEntry {
    pub subject_id: i32,
    pub log_date: Option<NaiveDate>,
    pub hand_raised_count: i32,
    pub submission_status: SubmissionStatus,
    pub attitude_score: Option<i32>,
}

/// Input for a one-off task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub task_type: TaskType,
    pub title: String,
    pub deadline: Option<NaiveDate>,
}

/// Input for a school test record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestRecord {
    pub test_name: String,
    pub test_date: NaiveDate,
    pub scores: SubjectScores,
}

/// School use-cases.
#[derive(Clone)]
pub struct SchoolService {
    school: Arc<dyn SchoolRepository>,
    subjects: Arc<dyn SubjectRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl SchoolService {
    pub fn new(
        school: Arc<dyn SchoolRepository>,
        subjects: Arc<dyn SubjectRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            school,
            subjects,
            profiles,
            clock,
        }
    }

    pub async fn subjects(&self) -> Result<Vec<Subject>, Error> {
        Ok(self.subjects.list().await?)
    }

    pub async fn workbooks(&self, student: &UserId) -> Result<Vec<Workbook>, Error> {
        Ok(self.school.list_workbooks(student).await?)
    }

    pub async fn create_workbook(
        &self,
        student: &UserId,
        draft: NewWorkbook,
    ) -> Result<Workbook, Error> {
        let workbook = Workbook {
            id: Uuid::new_v4(),
            student_id: *student,
            subject_id: draft.subject_id,
            title: validate_title(&draft.title).map_err(|e| map_validation_error("title", &e))?,
            current_page: 0,
            target_page: validate_page(draft.target_page)
                .map_err(|e| map_validation_error("targetPage", &e))?,
            deadline: draft.deadline,
            created_at: self.clock.utc(),
        };
        self.school.create_workbook(&workbook).await?;
        Ok(workbook)
    }

    /// Move the bookmark of one of the student's workbooks.
    pub async fn set_page(&self, student: &UserId, id: &Uuid, page: i32) -> Result<Workbook, Error> {
        let page = validate_page(page).map_err(|e| map_validation_error("currentPage", &e))?;
        self.school
            .set_workbook_page(id, student, page)
            .await?
            .ok_or_else(|| Error::not_found("workbook not found"))
    }

    /// Insert or replace the log for a subject and date.
    pub async fn record_daily_log(
        &self,
        student: &UserId,
        entry: DailyLogEntry,
    ) -> Result<DailyLog, Error> {
        validate_daily_log(entry.hand_raised_count, entry.attitude_score)
            .map_err(|e| map_validation_error("dailyLog", &e))?;
        let log = DailyLog {
            id: Uuid::new_v4(),
            student_id: *student,
            subject_id: entry.subject_id,
            log_date: entry
                .log_date
                .unwrap_or_else(|| tokyo_date(self.clock.utc())),
            hand_raised_count: entry.hand_raised_count,
            submission_status: entry.submission_status,
            attitude_score: entry.attitude_score,
        };
        Ok(self.school.upsert_daily_log(&log).await?)
    }

    pub async fn tasks(&self, student: &UserId) -> Result<Vec<OneOffTask>, Error> {
        Ok(self.school.list_tasks(student).await?)
    }

    pub async fn create_task(&self, student: &UserId, draft: NewTask) -> Result<OneOffTask, Error> {
        let task = OneOffTask {
            id: Uuid::new_v4(),
            student_id: *student,
            task_type: draft.task_type,
            title: validate_title(&draft.title).map_err(|e| map_validation_error("title", &e))?,
            deadline: draft.deadline,
            is_completed: false,
            created_at: self.clock.utc(),
        };
        self.school.create_task(&task).await?;
        Ok(task)
    }

    pub async fn complete_task(&self, student: &UserId, id: &Uuid) -> Result<OneOffTask, Error> {
        self.school
            .complete_task(id, student)
            .await?
            .ok_or_else(|| Error::not_found("task not found"))
    }

    /// The caller's school test records, oldest first.
    pub async fn test_records(&self, student: &UserId) -> Result<Vec<TestRecord>, Error> {
        Ok(self.school.list_test_records(student).await?)
    }

    pub async fn create_test_record(
        &self,
        student: &UserId,
        draft: NewTestRecord,
    ) -> Result<TestRecord, Error> {
        let test_name = validate_test_record(&draft.test_name, &draft.scores).map_err(|e| {
            let field = match e {
                SchoolValidationError::EmptyTitle => "testName",
                _ => "scores",
            };
            map_validation_error(field, &e)
        })?;
        let record = TestRecord {
            id: Uuid::new_v4(),
            student_id: *student,
            test_name,
            test_date: draft.test_date,
            scores: draft.scores,
            created_at: self.clock.utc(),
        };
        self.school.create_test_record(&record).await?;
        debug!(record_id = %record.id, "school test recorded");
        Ok(record)
    }

    /// Delete one of the caller's test records.
    pub async fn delete_test_record(&self, student: &UserId, id: &Uuid) -> Result<(), Error> {
        if self.school.delete_test_record(id, student).await? {
            Ok(())
        } else {
            Err(Error::not_found("test record not found"))
        }
    }

    /// Alerts for students of the caller's cram school.
    pub async fn alerts(&self, viewer: &Viewer) -> Result<Vec<StudentAlert>, Error> {
        let teacher = viewer.require_staff()?;
        let Some(cram_school_id) = teacher.cram_school_id else {
            return Ok(Vec::new());
        };
        let students = self.profiles.list_students(&cram_school_id).await?;
        if students.is_empty() {
            return Ok(Vec::new());
        }

        let today = tokyo_date(self.clock.utc());
        let ids: Vec<UserId> = students.iter().map(|s| s.id).collect();
        let (latest, forgot) = tokio::join!(
            self.school.latest_log_dates(&ids),
            self.school.forgot_logs_since(&ids, alert_window_start(today))
        );
        let forgot_students: BTreeSet<UserId> =
            forgot?.into_iter().map(|log| log.student_id).collect();
        let alerts = build_alerts(&students, &latest?, &forgot_students, today);
        debug!(%cram_school_id, count = alerts.len(), "teacher alerts built");
        Ok(alerts)
    }
}

#[cfg(test)]
#[path = "school_service_tests.rs"]
mod tests;
