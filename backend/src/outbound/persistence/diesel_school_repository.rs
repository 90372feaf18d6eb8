//! PostgreSQL-backed subject catalogue and school records.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{RepositoryError, SchoolRepository, SubjectRepository};
use crate::domain::school::{
    DailyLog, OneOffTask, Subject, SubjectScores, SubmissionStatus, TaskType, TestRecord, Workbook,
};

use super::error_mapping::{invalid_column, map_diesel_error, map_pool_error};
use super::models::{DailyLogRow, SubjectRow, TaskRow, TestRecordRow, WorkbookRow};
use super::pool::DbPool;
use super::schema::{daily_logs, one_off_tasks, school_tests, subjects, workbooks};

/// Diesel implementation of [`SubjectRepository`].
#[derive(Clone)]
pub struct DieselSubjectRepository {
    pool: DbPool,
}

impl DieselSubjectRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectRepository for DieselSubjectRepository {
    async fn list(&self) -> Result<Vec<Subject>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<SubjectRow> = subjects::table
            .order(subjects::id.asc())
            .select(SubjectRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| Subject {
                id: row.id,
                name: row.name,
            })
            .collect())
    }
}

/// Diesel implementation of [`SchoolRepository`].
#[derive(Clone)]
pub struct DieselSchoolRepository {
    pool: DbPool,
}

impl DieselSchoolRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_workbook(row: WorkbookRow) -> Workbook {
    Workbook {
        id: row.id,
        student_id: UserId::from_uuid(row.student_id),
        subject_id: row.subject_id,
        title: row.title,
        current_page: row.current_page,
        target_page: row.target_page,
        deadline: row.deadline,
        created_at: row.created_at,
    }
}

fn row_to_log(row: DailyLogRow) -> Result<DailyLog, RepositoryError> {
    let submission_status: SubmissionStatus = row
        .submission_status
        .parse()
        .map_err(|_| invalid_column("daily_logs.submission_status", &row.submission_status))?;
    Ok(DailyLog {
        id: row.id,
        student_id: UserId::from_uuid(row.student_id),
        subject_id: row.subject_id,
        log_date: row.log_date,
        hand_raised_count: row.hand_raised_count,
        submission_status,
        attitude_score: row.attitude_score,
    })
}

fn row_to_task(row: TaskRow) -> Result<OneOffTask, RepositoryError> {
    let task_type: TaskType = row
        .task_type
        .parse()
        .map_err(|_| invalid_column("one_off_tasks.task_type", &row.task_type))?;
    Ok(OneOffTask {
        id: row.id,
        student_id: UserId::from_uuid(row.student_id),
        task_type,
        title: row.title,
        deadline: row.deadline,
        is_completed: row.is_completed,
        created_at: row.created_at,
    })
}

fn row_to_test_record(row: TestRecordRow) -> TestRecord {
    TestRecord {
        id: row.id,
        student_id: UserId::from_uuid(row.student_id),
        test_name: row.test_name,
        test_date: row.test_date,
        scores: SubjectScores {
            english: row.english,
            math: row.math,
            japanese: row.japanese,
            science: row.science,
            social: row.social,
            music: row.music,
            art: row.art,
            pe: row.pe,
            tech_home: row.tech_home,
        },
        created_at: row.created_at,
    }
}

fn test_record_to_row(record: &TestRecord) -> TestRecordRow {
    let scores = record.scores;
    TestRecordRow {
        id: record.id,
        student_id: *record.student_id.as_uuid(),
        test_name: record.test_name.clone(),
        test_date: record.test_date,
        english: scores.english,
        math: scores.math,
        japanese: scores.japanese,
        science: scores.science,
        social: scores.social,
        music: scores.music,
        art: scores.art,
        pe: scores.pe,
        tech_home: scores.tech_home,
        created_at: record.created_at,
    }
}

fn uuids(ids: &[UserId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

#[async_trait]
impl SchoolRepository for DieselSchoolRepository {
    async fn list_workbooks(&self, student_id: &UserId) -> Result<Vec<Workbook>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<WorkbookRow> = workbooks::table
            .filter(workbooks::student_id.eq(student_id.as_uuid()))
            .order(workbooks::created_at.desc())
            .select(WorkbookRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_workbook).collect())
    }

    async fn create_workbook(&self, workbook: &Workbook) -> Result<(), RepositoryError> {
        let row = WorkbookRow {
            id: workbook.id,
            student_id: *workbook.student_id.as_uuid(),
            subject_id: workbook.subject_id,
            title: workbook.title.clone(),
            current_page: workbook.current_page,
            target_page: workbook.target_page,
            deadline: workbook.deadline,
            created_at: workbook.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(workbooks::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn set_workbook_page(
        &self,
        id: &Uuid,
        student_id: &UserId,
        page: i32,
    ) -> Result<Option<Workbook>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<WorkbookRow> = diesel::update(
            workbooks::table
                .filter(workbooks::id.eq(id))
                .filter(workbooks::student_id.eq(student_id.as_uuid())),
        )
        .set(workbooks::current_page.eq(page))
        .returning(WorkbookRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        Ok(row.map(row_to_workbook))
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<DailyLog, RepositoryError> {
        let row = DailyLogRow {
            id: log.id,
            student_id: *log.student_id.as_uuid(),
            subject_id: log.subject_id,
            log_date: log.log_date,
            hand_raised_count: log.hand_raised_count,
            submission_status: log.submission_status.as_str().to_owned(),
            attitude_score: log.attitude_score,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: DailyLogRow = diesel::insert_into(daily_logs::table)
            .values(&row)
            .on_conflict((
                daily_logs::student_id,
                daily_logs::subject_id,
                daily_logs::log_date,
            ))
            .do_update()
            .set((
                daily_logs::hand_raised_count.eq(excluded(daily_logs::hand_raised_count)),
                daily_logs::submission_status.eq(excluded(daily_logs::submission_status)),
                daily_logs::attitude_score.eq(excluded(daily_logs::attitude_score)),
            ))
            .returning(DailyLogRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_log(stored)
    }

    async fn latest_log_dates(
        &self,
        student_ids: &[UserId],
    ) -> Result<HashMap<UserId, NaiveDate>, RepositoryError> {
        if student_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(Uuid, Option<NaiveDate>)> = daily_logs::table
            .filter(daily_logs::student_id.eq_any(uuids(student_ids)))
            .group_by(daily_logs::student_id)
            .select((daily_logs::student_id, max(daily_logs::log_date)))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, date)| date.map(|date| (UserId::from_uuid(id), date)))
            .collect())
    }

    async fn forgot_logs_since(
        &self,
        student_ids: &[UserId],
        since: NaiveDate,
    ) -> Result<Vec<DailyLog>, RepositoryError> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DailyLogRow> = daily_logs::table
            .filter(daily_logs::student_id.eq_any(uuids(student_ids)))
            .filter(daily_logs::log_date.ge(since))
            .filter(daily_logs::submission_status.eq(SubmissionStatus::Forgot.as_str()))
            .select(DailyLogRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_log).collect()
    }

    async fn list_tasks(&self, student_id: &UserId) -> Result<Vec<OneOffTask>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TaskRow> = one_off_tasks::table
            .filter(one_off_tasks::student_id.eq(student_id.as_uuid()))
            .order((
                one_off_tasks::is_completed.asc(),
                one_off_tasks::deadline.asc().nulls_last(),
            ))
            .select(TaskRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_task).collect()
    }

    async fn create_task(&self, task: &OneOffTask) -> Result<(), RepositoryError> {
        let row = TaskRow {
            id: task.id,
            student_id: *task.student_id.as_uuid(),
            task_type: task.task_type.as_str().to_owned(),
            title: task.title.clone(),
            deadline: task.deadline,
            is_completed: task.is_completed,
            created_at: task.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(one_off_tasks::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn complete_task(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<Option<OneOffTask>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<TaskRow> = diesel::update(
            one_off_tasks::table
                .filter(one_off_tasks::id.eq(id))
                .filter(one_off_tasks::student_id.eq(student_id.as_uuid())),
        )
        .set(one_off_tasks::is_completed.eq(true))
        .returning(TaskRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        row.map(row_to_task).transpose()
    }

    async fn list_test_records(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<TestRecord>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<TestRecordRow> = school_tests::table
            .filter(school_tests::student_id.eq(student_id.as_uuid()))
            .order((school_tests::test_date.asc(), school_tests::created_at.asc()))
            .select(TestRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_test_record).collect())
    }

    async fn create_test_record(&self, record: &TestRecord) -> Result<(), RepositoryError> {
        let row = test_record_to_row(record);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(school_tests::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete_test_record(
        &self,
        id: &Uuid,
        student_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            school_tests::table
                .filter(school_tests::id.eq(id))
                .filter(school_tests::student_id.eq(student_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
