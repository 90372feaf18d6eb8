//! PostgreSQL-backed `ResultRepository`.
//!
//! Saves are a single `INSERT … ON CONFLICT (user_id, test_key) DO UPDATE`
//! so concurrent retries of one attempt converge on one row.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{RepositoryError, ResultRepository};
use crate::domain::results::{NewQuizResult, QuizResult, WordEntry};

use super::error_mapping::{map_diesel_error, map_json_error, map_pool_error};
use super::models::{NewQuizResultRow, QuizResultRow};
use super::pool::DbPool;
use super::schema::quiz_results;

/// Diesel implementation of [`ResultRepository`].
#[derive(Clone)]
pub struct DieselResultRepository {
    pool: DbPool,
}

impl DieselResultRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn words_to_json(words: &[WordEntry]) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(words).map_err(map_json_error)
}

fn words_from_json(value: serde_json::Value) -> Result<Vec<WordEntry>, RepositoryError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(map_json_error)
}

fn row_to_result(row: QuizResultRow) -> Result<QuizResult, RepositoryError> {
    Ok(QuizResult {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        selected_text: row.selected_text,
        unit: row.unit,
        start_num: row.start_num,
        end_num: row.end_num,
        total: row.total,
        correct: row.correct,
        incorrect_count: row.incorrect_count,
        incorrect_words: words_from_json(row.incorrect_words)?,
        correct_words: words_from_json(row.correct_words)?,
        test_key: row.test_key,
        mode: row.mode,
        created_at: row.created_at,
    })
}

#[async_trait]
impl ResultRepository for DieselResultRepository {
    async fn upsert(&self, result: &NewQuizResult) -> Result<QuizResult, RepositoryError> {
        let row = NewQuizResultRow {
            id: Uuid::new_v4(),
            user_id: *result.user_id.as_uuid(),
            selected_text: &result.selected_text,
            unit: result.unit.as_deref(),
            start_num: result.start_num,
            end_num: result.end_num,
            total: result.total,
            correct: result.correct,
            incorrect_count: result.incorrect_count,
            incorrect_words: words_to_json(&result.incorrect_words)?,
            correct_words: words_to_json(&result.correct_words)?,
            test_key: &result.test_key,
            mode: result.mode.as_deref(),
            created_at: Utc::now(),
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: QuizResultRow = diesel::insert_into(quiz_results::table)
            .values(&row)
            .on_conflict((quiz_results::user_id, quiz_results::test_key))
            .do_update()
            .set((
                quiz_results::selected_text.eq(excluded(quiz_results::selected_text)),
                quiz_results::unit.eq(excluded(quiz_results::unit)),
                quiz_results::start_num.eq(excluded(quiz_results::start_num)),
                quiz_results::end_num.eq(excluded(quiz_results::end_num)),
                quiz_results::total.eq(excluded(quiz_results::total)),
                quiz_results::correct.eq(excluded(quiz_results::correct)),
                quiz_results::incorrect_count.eq(excluded(quiz_results::incorrect_count)),
                quiz_results::incorrect_words.eq(excluded(quiz_results::incorrect_words)),
                quiz_results::correct_words.eq(excluded(quiz_results::correct_words)),
                quiz_results::mode.eq(excluded(quiz_results::mode)),
            ))
            .returning(QuizResultRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_result(stored)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<QuizResult>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<QuizResultRow> = quiz_results::table
            .filter(quiz_results::user_id.eq(user_id.as_uuid()))
            .order(quiz_results::created_at.desc())
            .select(QuizResultRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_word_lists_decode_as_empty() {
        assert!(words_from_json(serde_json::Value::Null).expect("decodes").is_empty());
    }

    #[test]
    fn word_lists_tolerate_missing_text() {
        let words = words_from_json(json!([{"word_number": 12}])).expect("decodes");
        assert_eq!(<[WordEntry]>::first(&words).map(|w| w.word_number), Some(12));
        assert_eq!(<[WordEntry]>::first(&words).map(|w| w.word.as_str()), Some(""));
    }

    #[test]
    fn malformed_word_lists_are_query_errors() {
        assert!(matches!(
            words_from_json(json!({"word_number": 1})),
            Err(RepositoryError::Query { .. })
        ));
    }
}
