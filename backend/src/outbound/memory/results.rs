//! In-memory quiz result store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockable::Clock;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{RepositoryError, ResultRepository};
use crate::domain::results::{NewQuizResult, QuizResult};

use super::lock;

/// Results kept in insertion order; `(user_id, test_key)` is unique.
pub struct InMemoryResultRepository {
    results: Mutex<Vec<QuizResult>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryResultRepository {
    /// Empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            clock,
        }
    }
}

fn overwrite(target: &mut QuizResult, result: &NewQuizResult) {
    target.selected_text.clone_from(&result.selected_text);
    target.unit.clone_from(&result.unit);
    target.start_num = result.start_num;
    target.end_num = result.end_num;
    target.total = result.total;
    target.correct = result.correct;
    target.incorrect_count = result.incorrect_count;
    target.incorrect_words.clone_from(&result.incorrect_words);
    target.correct_words.clone_from(&result.correct_words);
    target.mode.clone_from(&result.mode);
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn upsert(&self, result: &NewQuizResult) -> Result<QuizResult, RepositoryError> {
        let mut results = lock(&self.results);
        if let Some(existing) = results
            .iter_mut()
            .find(|row| row.user_id == result.user_id && row.test_key == result.test_key)
        {
            overwrite(existing, result);
            return Ok(existing.clone());
        }
        let row = QuizResult {
            id: Uuid::new_v4(),
            user_id: result.user_id,
            selected_text: result.selected_text.clone(),
            unit: result.unit.clone(),
            start_num: result.start_num,
            end_num: result.end_num,
            total: result.total,
            correct: result.correct,
            incorrect_count: result.incorrect_count,
            incorrect_words: result.incorrect_words.clone(),
            correct_words: result.correct_words.clone(),
            test_key: result.test_key.clone(),
            mode: result.mode.clone(),
            created_at: self.clock.utc(),
        };
        results.push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<QuizResult>, RepositoryError> {
        let mut rows: Vec<QuizResult> = lock(&self.results)
            .iter()
            .filter(|row| &row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
