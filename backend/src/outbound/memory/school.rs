//! In-memory subjects, workbooks, daily logs, tasks, and test records.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{RepositoryError, SchoolRepository, SubjectRepository};
use crate::domain::school::{
    DailyLog, OneOffTask, Subject, SubmissionStatus, TestRecord, Workbook,
};

use super::lock;

/// Fixed subject catalogue.
#[derive(Debug, Clone)]
pub struct InMemorySubjectRepository {
    subjects: Vec<Subject>,
}

impl Default for InMemorySubjectRepository {
    fn default() -> Self {
        let names = ["国語", "数学", "英語", "理科", "社会"];
        let subjects = (1..)
            .zip(names)
            .map(|(id, name)| Subject {
                id,
                name: name.to_owned(),
            })
            .collect();
        Self { subjects }
    }
}

#[async_trait]
impl SubjectRepository for InMemorySubjectRepository {
    async fn list(&self) -> Result<Vec<Subject>, RepositoryError> {
        Ok(self.subjects.clone())
    }
}

#[derive(Debug, Default)]
struct SchoolData {
    workbooks: Vec<Workbook>,
    logs: Vec<DailyLog>,
    tasks: Vec<OneOffTask>,
    test_records: Vec<TestRecord>,
}

/// School records for every student.
#[derive(Debug, Default)]
pub struct InMemorySchoolRepository {
    data: Mutex<SchoolData>,
}

#[async_trait]
impl SchoolRepository for InMemorySchoolRepository {
    async fn list_workbooks(&self, student_id: &UserId) -> Result<Vec<Workbook>, RepositoryError> {
        let mut workbooks: Vec<Workbook> = lock(&self.data)
            .workbooks
            .iter()
            .filter(|workbook| &workbook.student_id == student_id)
            .cloned()
            .collect();
        workbooks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workbooks)
    }

    async fn create_workbook(&self, workbook: &Workbook) -> Result<(), RepositoryError> {
        lock(&self.data).workbooks.push(workbook.clone());
        Ok(())
    }

    async fn set_workbook_page(
        &self,
        id: &Uuid,
        student_id: &UserId,
        page: i32,
    ) -> Result<Option<Workbook>, RepositoryError> {
        let mut data = lock(&self.data);
        let workbook = data
            .workbooks
            .iter_mut()
            .find(|workbook| &workbook.id == id && &workbook.student_id == student_id);
        Ok(workbook.map(|workbook| {
            workbook.current_page = page;
            workbook.clone()
        }))
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<DailyLog, RepositoryError> {
        let mut data = lock(&self.data);
        if let Some(existing) = data.logs.iter_mut().find(|existing| {
            existing.student_id == log.student_id
                && existing.subject_id == log.subject_id
                && existing.log_date == log.log_date
        }) {
            existing.hand_raised_count = log.hand_raised_count;
            existing.submission_status = log.submission_status;
            existing.attitude_score = log.attitude_score;
            return Ok(existing.clone());
        }
        data.logs.push(log.clone());
        Ok(log.clone())
    }

    async fn latest_log_dates(
        &self,
        student_ids: &[UserId],
    ) -> Result<HashMap<UserId, NaiveDate>, RepositoryError> {
        let mut latest = HashMap::new();
        for log in lock(&self.data)
            .logs
            .iter()
            .filter(|log| student_ids.contains(&log.student_id))
        {
            latest
                .entry(log.student_id)
                .and_modify(|date: &mut NaiveDate| *date = (*date).max(log.log_date))
                .or_insert(log.log_date);
        }
        Ok(latest)
    }

    async fn forgot_logs_since(
        &self,
        student_ids: &[UserId],
        since: NaiveDate,
    ) -> Result<Vec<DailyLog>, RepositoryError> {
        Ok(lock(&self.data)
            .logs
            .iter()
            .filter(|log| {
                student_ids.contains(&log.student_id)
                    && log.log_date >= since
                    && log.submission_status == SubmissionStatus::Forgot
            })
            .cloned()
            .collect())
    }

    async fn list_tasks(&self, student_id: &UserId) -> Result<Vec<OneOffTask>, RepositoryError> {
        let mut tasks: Vec<OneOffTask> = lock(&self.data)
            .tasks
            .iter()
            .filter(|task| &task.student_id == student_id)
            .cloned()
            .collect();
        // Open before done; within each, dated before undated.
        tasks.sort_by(|a, b| {
            a.is_completed
                .cmp(&b.is_completed)
                .then_with(|| match (a.deadline, b.deadline) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        Ok(tasks)
    }

    async fn create_task(&self, task: &OneOffTask) -> Result<(), RepositoryError> {
        lock(&self.data).tasks.push(task.clone());
        Ok(())
    }

    async fn complete_task(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<Option<OneOffTask>, RepositoryError> {
        let mut data = lock(&self.data);
        let task = data
            .tasks
            .iter_mut()
            .find(|task| &task.id == id && &task.student_id == student_id);
        Ok(task.map(|task| {
            task.is_completed = true;
            task.clone()
        }))
    }

    async fn list_test_records(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<TestRecord>, RepositoryError> {
        let mut records: Vec<TestRecord> = lock(&self.data)
            .test_records
            .iter()
            .filter(|record| &record.student_id == student_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.test_date, record.created_at));
        Ok(records)
    }

    async fn create_test_record(&self, record: &TestRecord) -> Result<(), RepositoryError> {
        lock(&self.data).test_records.push(record.clone());
        Ok(())
    }

    async fn delete_test_record(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let mut data = lock(&self.data);
        let before = data.test_records.len();
        data.test_records
            .retain(|record| !(&record.id == id && &record.student_id == student_id));
        Ok(data.test_records.len() < before)
    }
}
