//! PostgreSQL-backed exam calendar.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::exam_calendar::{ExamCategory, ExamSession, OfficialExam};
use crate::domain::ports::{ExamCalendarRepository, RepositoryError};

use super::error_mapping::{invalid_column, map_diesel_error, map_pool_error};
use super::models::{ExamSessionRow, OfficialExamRow};
use super::pool::DbPool;
use super::schema::{exam_schedules, official_exams};

/// Diesel implementation of [`ExamCalendarRepository`].
#[derive(Clone)]
pub struct DieselExamCalendarRepository {
    pool: DbPool,
}

impl DieselExamCalendarRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<ExamSessionRow> for ExamSession {
    fn from(row: ExamSessionRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            session_slug: row.session_slug,
            exam_name: row.exam_name,
            session_name: row.session_name,
            primary_exam_date: row.primary_exam_date,
            result_date: row.result_date,
            is_active: row.is_active,
        }
    }
}

impl From<&ExamSession> for ExamSessionRow {
    fn from(session: &ExamSession) -> Self {
        Self {
            id: session.id,
            slug: session.slug.clone(),
            session_slug: session.session_slug.clone(),
            exam_name: session.exam_name.clone(),
            session_name: session.session_name.clone(),
            primary_exam_date: session.primary_exam_date,
            result_date: session.result_date,
            is_active: session.is_active,
        }
    }
}

fn row_to_official_exam(row: OfficialExamRow) -> Result<OfficialExam, RepositoryError> {
    let category: ExamCategory = row
        .category
        .parse()
        .map_err(|_| invalid_column("official_exams.category", &row.category))?;
    Ok(OfficialExam {
        id: row.id,
        year: row.year,
        prefecture_id: row.prefecture_id,
        category,
        name: row.name,
        exam_date: row.exam_date,
        result_date: row.result_date,
        application_start: row.application_start,
        application_end: row.application_end,
    })
}

fn official_exam_to_row(exam: &OfficialExam) -> OfficialExamRow {
    OfficialExamRow {
        id: exam.id,
        year: exam.year,
        prefecture_id: exam.prefecture_id,
        category: exam.category.as_str().to_owned(),
        name: exam.name.clone(),
        exam_date: exam.exam_date,
        result_date: exam.result_date,
        application_start: exam.application_start,
        application_end: exam.application_end,
    }
}

#[async_trait]
impl ExamCalendarRepository for DieselExamCalendarRepository {
    async fn sessions_for_exam(&self, slug: &str) -> Result<Vec<ExamSession>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ExamSessionRow> = exam_schedules::table
            .filter(exam_schedules::slug.eq(slug))
            .filter(exam_schedules::is_active.eq(true))
            .order(exam_schedules::primary_exam_date.asc())
            .select(ExamSessionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(ExamSession::from).collect())
    }

    async fn find_session(
        &self,
        slug: &str,
        session_slug: &str,
    ) -> Result<Option<ExamSession>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ExamSessionRow> = exam_schedules::table
            .filter(exam_schedules::slug.eq(slug))
            .filter(exam_schedules::session_slug.eq(session_slug))
            .select(ExamSessionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(ExamSession::from))
    }

    async fn list_sessions(&self) -> Result<Vec<ExamSession>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ExamSessionRow> = exam_schedules::table
            .order((
                exam_schedules::primary_exam_date.desc(),
                exam_schedules::slug.asc(),
            ))
            .select(ExamSessionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(ExamSession::from).collect())
    }

    async fn upsert_session(&self, session: &ExamSession) -> Result<ExamSession, RepositoryError> {
        let row = ExamSessionRow::from(session);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: ExamSessionRow = diesel::insert_into(exam_schedules::table)
            .values(&row)
            .on_conflict(exam_schedules::id)
            .do_update()
            .set(&row)
            .returning(ExamSessionRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(stored.into())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(exam_schedules::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn official_exams(
        &self,
        year: i32,
        prefecture_id: Option<i32>,
    ) -> Result<Vec<OfficialExam>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = official_exams::table
            .filter(official_exams::year.eq(year))
            .into_boxed();
        if let Some(prefecture_id) = prefecture_id {
            query = query.filter(official_exams::prefecture_id.eq(prefecture_id));
        }
        let rows: Vec<OfficialExamRow> = query
            .order((
                official_exams::prefecture_id.asc(),
                official_exams::exam_date.asc(),
            ))
            .select(OfficialExamRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_official_exam).collect()
    }

    async fn upsert_official_exam(
        &self,
        exam: &OfficialExam,
    ) -> Result<OfficialExam, RepositoryError> {
        let row = official_exam_to_row(exam);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: OfficialExamRow = diesel::insert_into(official_exams::table)
            .values(&row)
            .on_conflict(official_exams::id)
            .do_update()
            .set(&row)
            .returning(OfficialExamRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_official_exam(stored)
    }

    async fn delete_official_exam(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(official_exams::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
