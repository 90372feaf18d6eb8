//! In-memory exam calendar.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::exam_calendar::{ExamSession, OfficialExam};
use crate::domain::ports::{ExamCalendarRepository, RepositoryError};

use super::lock;

#[derive(Debug, Default)]
struct CalendarData {
    sessions: Vec<ExamSession>,
    official: Vec<OfficialExam>,
}

/// Exam sessions and entrance exams.
#[derive(Debug, Default)]
pub struct InMemoryExamCalendarRepository {
    data: Mutex<CalendarData>,
}

fn replace_or_push<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

#[async_trait]
impl ExamCalendarRepository for InMemoryExamCalendarRepository {
    async fn sessions_for_exam(&self, slug: &str) -> Result<Vec<ExamSession>, RepositoryError> {
        let mut sessions: Vec<_> = lock(&self.data)
            .sessions
            .iter()
            .filter(|session| session.is_active && session.slug == slug)
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.primary_exam_date);
        Ok(sessions)
    }

    async fn find_session(
        &self,
        slug: &str,
        session_slug: &str,
    ) -> Result<Option<ExamSession>, RepositoryError> {
        Ok(lock(&self.data)
            .sessions
            .iter()
            .find(|session| session.slug == slug && session.session_slug == session_slug)
            .cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<ExamSession>, RepositoryError> {
        let mut sessions = lock(&self.data).sessions.clone();
        sessions.sort_by(|a, b| b.primary_exam_date.cmp(&a.primary_exam_date));
        Ok(sessions)
    }

    async fn upsert_session(&self, session: &ExamSession) -> Result<ExamSession, RepositoryError> {
        let mut data = lock(&self.data);
        if data.sessions.iter().any(|existing| {
            existing.id != session.id
                && existing.slug == session.slug
                && existing.session_slug == session.session_slug
        }) {
            return Err(RepositoryError::duplicate("exam_schedules_slug_session"));
        }
        replace_or_push(&mut data.sessions, session, |existing| existing.id == session.id);
        Ok(session.clone())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut data = lock(&self.data);
        let before = data.sessions.len();
        data.sessions.retain(|session| &session.id != id);
        Ok(data.sessions.len() < before)
    }

    async fn official_exams(
        &self,
        year: i32,
        prefecture_id: Option<i32>,
    ) -> Result<Vec<OfficialExam>, RepositoryError> {
        let mut exams: Vec<_> = lock(&self.data)
            .official
            .iter()
            .filter(|exam| {
                exam.year == year && prefecture_id.is_none_or(|id| exam.prefecture_id == id)
            })
            .cloned()
            .collect();
        exams.sort_by_key(|exam| (exam.prefecture_id, exam.exam_date));
        Ok(exams)
    }

    async fn upsert_official_exam(
        &self,
        exam: &OfficialExam,
    ) -> Result<OfficialExam, RepositoryError> {
        let mut data = lock(&self.data);
        replace_or_push(&mut data.official, exam, |existing| existing.id == exam.id);
        Ok(exam.clone())
    }

    async fn delete_official_exam(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut data = lock(&self.data);
        let before = data.official.len();
        data.official.retain(|exam| &exam.id != id);
        Ok(data.official.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exam_calendar::ExamCategory;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, d).expect("valid date")
    }

    fn session(session_slug: &str, exam: NaiveDate) -> ExamSession {
        ExamSession {
            id: Uuid::new_v4(),
            slug: "kanken".to_owned(),
            session_slug: session_slug.to_owned(),
            exam_name: "漢検".to_owned(),
            session_name: session_slug.to_owned(),
            primary_exam_date: exam,
            result_date: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn session_slugs_are_unique_per_exam() {
        let repo = InMemoryExamCalendarRepository::default();
        let first = session("2027-1", day(6, 20));
        repo.upsert_session(&first).await.expect("stored");

        let clash = repo
            .upsert_session(&session("2027-1", day(6, 27)))
            .await
            .expect_err("duplicate");
        assert!(matches!(clash, RepositoryError::Duplicate { .. }));

        let renamed = ExamSession {
            session_name: "第1回".to_owned(),
            ..first
        };
        repo.upsert_session(&renamed).await.expect("replaced");
        assert_eq!(repo.list_sessions().await.expect("list"), [renamed]);
    }

    #[tokio::test]
    async fn only_active_sessions_are_listed_for_students() {
        let repo = InMemoryExamCalendarRepository::default();
        let later = session("2027-2", day(10, 10));
        let earlier = session("2027-1", day(6, 20));
        let hidden = ExamSession {
            is_active: false,
            ..session("2028-1", day(1, 30))
        };
        for item in [&later, &earlier, &hidden] {
            repo.upsert_session(item).await.expect("stored");
        }

        let listed = repo.sessions_for_exam("kanken").await.expect("list");
        assert_eq!(listed, [earlier, later]);
    }

    #[tokio::test]
    async fn official_exams_filter_by_prefecture() {
        let repo = InMemoryExamCalendarRepository::default();
        for prefecture_id in [13, 28] {
            repo.upsert_official_exam(&OfficialExam {
                id: Uuid::new_v4(),
                year: 2027,
                prefecture_id,
                category: ExamCategory::PublicGeneral,
                name: "一般".to_owned(),
                exam_date: day(3, 12),
                result_date: None,
                application_start: None,
                application_end: None,
            })
            .await
            .expect("stored");
        }

        assert_eq!(repo.official_exams(2027, None).await.expect("all").len(), 2);
        let hyogo = repo.official_exams(2027, Some(28)).await.expect("hyogo");
        assert_eq!(hyogo.len(), 1);
        assert!(repo.official_exams(2026, Some(28)).await.expect("none").is_empty());
        assert!(repo.delete_official_exam(&hyogo[0].id).await.expect("deleted"));
    }
}
