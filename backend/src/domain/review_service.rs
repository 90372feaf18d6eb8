//! Weak-word listings and review test generation.

use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use tracing::info;

use crate::domain::ports::{ProfileRepository, ResultRepository};
use crate::domain::textbook::{review_test_title, review_textbook_key};
use crate::domain::weak_words::{
    ReviewFilter, TextbookWeakWords, WeakWord, aggregate_weak_words, select_review_words,
};
use crate::domain::{Error, UserId};

/// A sampled review test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTest {
    pub title: String,
    pub textbook: String,
    pub words: Vec<WeakWord>,
}

/// Review use-cases over stored quiz results.
#[derive(Clone)]
pub struct ReviewService {
    results: Arc<dyn ResultRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(
        results: Arc<dyn ResultRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            results,
            profiles,
            clock,
        }
    }

    /// Weak words grouped by textbook, optionally narrowed to one textbook.
    pub async fn weak_words(
        &self,
        user_id: &UserId,
        textbook: Option<&str>,
    ) -> Result<Vec<TextbookWeakWords>, Error> {
        let results = self.results.list_for_user(user_id).await?;
        let mut grouped = aggregate_weak_words(&results, self.clock.utc());
        if let Some(wanted) = textbook.map(review_textbook_key).filter(|t| !t.is_empty()) {
            grouped.retain(|group| group.textbook == wanted);
        }
        Ok(grouped)
    }

    /// Sample a review test and count it as a taken test.
    pub async fn create_test(
        &self,
        user_id: &UserId,
        textbook: &str,
        filter: &ReviewFilter,
    ) -> Result<ReviewTest, Error> {
        let grouped = self.weak_words(user_id, Some(textbook)).await?;
        let Some(group) = grouped.into_iter().next() else {
            return Err(Error::not_found(format!(
                "no weak words recorded for {textbook}"
            )));
        };

        let words = select_review_words(&group.words, filter, &mut rand::thread_rng());
        if words.is_empty() {
            return Err(Error::invalid_request("no words match the selected filters"));
        }

        self.profiles.increment_test_count(user_id).await?;
        info!(textbook = %group.textbook, count = words.len(), "review test created");
        Ok(ReviewTest {
            title: review_test_title(&group.textbook),
            textbook: group.textbook,
            words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockProfileRepository, MockResultRepository};
    use crate::domain::results::{QuizResult, WordEntry};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockable::MockClock;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn result(textbook: &str, misses: &[i32], days_ago: i64) -> QuizResult {
        QuizResult {
            id: Uuid::new_v4(),
            user_id: UserId::random(),
            selected_text: textbook.to_owned(),
            unit: None,
            start_num: None,
            end_num: None,
            total: 10,
            correct: 10 - misses.len() as i32,
            incorrect_count: misses.len() as i32,
            incorrect_words: misses
                .iter()
                .map(|n| WordEntry {
                    word_number: *n,
                    word: format!("word{n}"),
                    meaning: format!("意味{n}"),
                })
                .collect(),
            correct_words: Vec::new(),
            test_key: Uuid::new_v4().to_string(),
            mode: None,
            created_at: now() - Duration::days(days_ago),
        }
    }

    #[fixture]
    fn clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().return_const(now());
        Arc::new(clock)
    }

    fn results_repo(results: Vec<QuizResult>) -> MockResultRepository {
        let mut repo = MockResultRepository::new();
        repo.expect_list_for_user()
            .returning(move |_| Ok(results.clone()));
        repo
    }

    #[rstest]
    #[tokio::test]
    async fn weak_words_can_be_narrowed_to_a_textbook(clock: Arc<dyn Clock>) {
        let repo = results_repo(vec![
            result("ターゲット1900", &[1, 2], 1),
            result("LEAP", &[5], 1),
        ]);
        let service = ReviewService::new(
            Arc::new(repo),
            Arc::new(MockProfileRepository::new()),
            clock,
        );

        let grouped = service
            .weak_words(&UserId::random(), Some("LEAP (復習テスト)"))
            .await
            .expect("listing succeeds");

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].textbook, "LEAP");
    }

    #[rstest]
    #[tokio::test]
    async fn create_test_samples_and_counts_the_test(clock: Arc<dyn Clock>) {
        let repo = results_repo(vec![
            result("LEAP", &[1, 2, 3], 2),
            result("LEAP", &[1], 1),
        ]);
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_increment_test_count()
            .times(1)
            .returning(|_| Ok(()));
        let service = ReviewService::new(Arc::new(repo), Arc::new(profiles), clock);

        let test = service
            .create_test(&UserId::random(), "LEAP", &ReviewFilter::default())
            .await
            .expect("test created");

        assert_eq!(test.title, "LEAP (復習テスト)");
        assert_eq!(test.words.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_selection_is_rejected(clock: Arc<dyn Clock>) {
        let repo = results_repo(vec![result("LEAP", &[1], 90)]);
        let mut profiles = MockProfileRepository::new();
        profiles.expect_increment_test_count().never();
        let service = ReviewService::new(Arc::new(repo), Arc::new(profiles), clock);

        // The only word is a stale single miss, which is excluded by default.
        let error = service
            .create_test(&UserId::random(), "LEAP", &ReviewFilter::default())
            .await
            .expect_err("nothing to review");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_textbook_is_not_found(clock: Arc<dyn Clock>) {
        let service = ReviewService::new(
            Arc::new(results_repo(Vec::new())),
            Arc::new(MockProfileRepository::new()),
            clock,
        );

        let error = service
            .create_test(&UserId::random(), "LEAP", &ReviewFilter::default())
            .await
            .expect_err("no history");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
