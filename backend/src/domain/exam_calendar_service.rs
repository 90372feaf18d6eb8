//! Countdown queries for students and calendar upkeep for administrators.

use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::exam_calendar::{
    Countdown, ExamCalendarError, ExamCategory, ExamSession, OfficialExam, Prefecture,
    check_result_date, countdown, prefecture_by_slug, required, slug, validate_official_exam,
};
use crate::domain::ports::ExamCalendarRepository;
use crate::domain::{Error, Viewer, tokyo_date};

fn map_calendar_error(error: &ExamCalendarError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": "invalid_value",
    }))
}

/// A session with its countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCountdown {
    pub session: ExamSession,
    pub countdown: Countdown,
}

/// An entrance exam with its countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialExamCountdown {
    pub exam: OfficialExam,
    pub countdown: Countdown,
}

/// A prefecture's entrance exams for one school year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefectureSchedule {
    pub prefecture: &'static Prefecture,
    pub year: i32,
    pub exams: Vec<OfficialExamCountdown>,
}

/// Fields of a session to create (`id` absent) or replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSessionDraft {
    pub id: Option<Uuid>,
    pub slug: String,
    pub session_slug: String,
    pub exam_name: String,
    pub session_name: String,
    pub primary_exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub is_active: bool,
}

/// Fields of an entrance exam to create (`id` absent) or replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialExamDraft {
    pub id: Option<Uuid>,
    pub year: i32,
    pub prefecture_id: i32,
    pub category: ExamCategory,
    pub name: String,
    pub exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
}

impl ExamSessionDraft {
    fn into_session(self) -> Result<ExamSession, ExamCalendarError> {
        check_result_date(self.primary_exam_date, self.result_date)?;
        Ok(ExamSession {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            slug: slug("slug", &self.slug)?,
            session_slug: slug("sessionSlug", &self.session_slug)?,
            exam_name: required("examName", &self.exam_name)?,
            session_name: required("sessionName", &self.session_name)?,
            primary_exam_date: self.primary_exam_date,
            result_date: self.result_date,
            is_active: self.is_active,
        })
    }
}

impl OfficialExamDraft {
    fn into_exam(self) -> Result<OfficialExam, ExamCalendarError> {
        let exam = OfficialExam {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            year: self.year,
            prefecture_id: self.prefecture_id,
            category: self.category,
            name: required("name", &self.name)?,
            exam_date: self.exam_date,
            result_date: self.result_date,
            application_start: self.application_start,
            application_end: self.application_end,
        };
        validate_official_exam(&exam)?;
        Ok(exam)
    }
}

/// Exam calendar use-cases.
#[derive(Clone)]
pub struct ExamCalendarService {
    calendar: Arc<dyn ExamCalendarRepository>,
    clock: Arc<dyn Clock>,
}

impl ExamCalendarService {
    pub fn new(calendar: Arc<dyn ExamCalendarRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { calendar, clock }
    }

    fn today(&self) -> NaiveDate {
        tokyo_date(self.clock.utc())
    }

    /// Sessions of one exam that have not finished, soonest first.
    pub async fn upcoming_sessions(&self, exam_slug: &str) -> Result<Vec<SessionCountdown>, Error> {
        let today = self.today();
        let sessions = self.calendar.sessions_for_exam(exam_slug.trim()).await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.is_upcoming(today))
            .map(|session| SessionCountdown {
                countdown: countdown(session.primary_exam_date, today),
                session,
            })
            .collect())
    }

    /// One active session. Finished sessions are still shown.
    pub async fn session(
        &self,
        exam_slug: &str,
        session_slug: &str,
    ) -> Result<SessionCountdown, Error> {
        let session = self
            .calendar
            .find_session(exam_slug.trim(), session_slug.trim())
            .await?
            .filter(|session| session.is_active)
            .ok_or_else(|| Error::not_found("exam session not found"))?;
        Ok(SessionCountdown {
            countdown: countdown(session.primary_exam_date, self.today()),
            session,
        })
    }

    /// A prefecture's entrance exams for `year`, earliest first.
    pub async fn prefecture_schedule(
        &self,
        prefecture_slug: &str,
        year: i32,
    ) -> Result<PrefectureSchedule, Error> {
        let prefecture = prefecture_by_slug(prefecture_slug)
            .ok_or_else(|| Error::not_found("unknown prefecture"))?;
        let today = self.today();
        let exams = self
            .calendar
            .official_exams(year, Some(prefecture.id))
            .await?
            .into_iter()
            .map(|exam| OfficialExamCountdown {
                countdown: countdown(exam.exam_date, today),
                exam,
            })
            .collect();
        Ok(PrefectureSchedule {
            prefecture,
            year,
            exams,
        })
    }

    /// Every session, for administrators.
    pub async fn all_sessions(&self, viewer: &Viewer) -> Result<Vec<ExamSession>, Error> {
        viewer.require_admin()?;
        Ok(self.calendar.list_sessions().await?)
    }

    pub async fn save_session(
        &self,
        viewer: &Viewer,
        draft: ExamSessionDraft,
    ) -> Result<ExamSession, Error> {
        viewer.require_admin()?;
        let session = draft
            .into_session()
            .map_err(|e| map_calendar_error(&e))?;
        let stored = self.calendar.upsert_session(&session).await?;
        info!(session_id = %stored.id, slug = %stored.slug, "exam session saved");
        Ok(stored)
    }

    pub async fn delete_session(&self, viewer: &Viewer, id: &Uuid) -> Result<(), Error> {
        viewer.require_admin()?;
        if self.calendar.delete_session(id).await? {
            Ok(())
        } else {
            Err(Error::not_found("exam session not found"))
        }
    }

    /// Entrance exams of a year, for administrators.
    pub async fn official_exams(
        &self,
        viewer: &Viewer,
        year: i32,
        prefecture_id: Option<i32>,
    ) -> Result<Vec<OfficialExam>, Error> {
        viewer.require_admin()?;
        Ok(self.calendar.official_exams(year, prefecture_id).await?)
    }

    /// Store a batch of entrance exams, e.g. rows confirmed after an import.
    ///
    /// Every draft is validated before anything is written.
    pub async fn save_official_exams(
        &self,
        viewer: &Viewer,
        drafts: Vec<OfficialExamDraft>,
    ) -> Result<Vec<OfficialExam>, Error> {
        viewer.require_admin()?;
        if drafts.is_empty() {
            return Err(Error::invalid_request("at least one exam is required")
                .with_details(json!({"field": "exams", "code": "missing_field"})));
        }
        let exams = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft.into_exam().map_err(|e| {
                    map_calendar_error(&e).with_details(json!({
                        "field": e.field(),
                        "index": index,
                        "code": "invalid_value",
                    }))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut stored = Vec::with_capacity(exams.len());
        for exam in &exams {
            stored.push(self.calendar.upsert_official_exam(exam).await?);
        }
        info!(count = stored.len(), "official exams saved");
        Ok(stored)
    }

    pub async fn delete_official_exam(&self, viewer: &Viewer, id: &Uuid) -> Result<(), Error> {
        viewer.require_admin()?;
        if self.calendar.delete_official_exam(id).await? {
            Ok(())
        } else {
            Err(Error::not_found("official exam not found"))
        }
    }
}
