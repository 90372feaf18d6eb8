//! Quiz results keyed for idempotent saves.
//!
//! A client may submit the same attempt several times (retries, reloads). The
//! test key is derived from the attempt identity so repeated submissions
//! overwrite one row per `(user, test_key)` instead of duplicating it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;
use super::textbook::{derive_unit, normalize_textbook_name};

/// A quiz item as stored in result word lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word_number: i32,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub meaning: String,
}

/// Product that produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// Vocabulary quiz.
    Mistap,
    /// Maths drill.
    Mathtap,
}

impl ResultMode {
    /// Persisted mode tag; vocabulary results leave it empty.
    pub fn as_tag(self) -> Option<&'static str> {
        match self {
            Self::Mistap => None,
            Self::Mathtap => Some("mathtap"),
        }
    }
}

/// A persisted quiz result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub id: Uuid,
    pub user_id: UserId,
    pub selected_text: String,
    pub unit: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub correct: i32,
    pub incorrect_count: i32,
    pub incorrect_words: Vec<WordEntry>,
    pub correct_words: Vec<WordEntry>,
    pub test_key: String,
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values written by an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizResult {
    pub user_id: UserId,
    pub selected_text: String,
    pub unit: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub correct: i32,
    pub incorrect_count: i32,
    pub incorrect_words: Vec<WordEntry>,
    pub correct_words: Vec<WordEntry>,
    pub test_key: String,
    pub mode: Option<String>,
}

/// Validation failures for result submissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultValidationError {
    #[error("attempt id must not be empty")]
    EmptyAttemptId,
    #[error("total must not be negative")]
    NegativeTotal,
    #[error("incorrect words exceed the total")]
    TooManyIncorrect,
    #[error("start number must not exceed end number")]
    InvertedRange,
}

/// A vocabulary quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistapSubmission {
    pub selected_text: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub incorrect_words: Vec<WordEntry>,
    pub correct_words: Vec<WordEntry>,
    pub attempt_id: String,
}

/// A maths drill submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathtapSubmission {
    pub grade: String,
    pub unit: String,
    pub total: i32,
    pub correct: i32,
    pub incorrect: Vec<WordEntry>,
    pub attempt_id: String,
}

fn join_numbers(words: &[WordEntry], sorted: bool) -> String {
    let mut numbers: Vec<i32> = words.iter().map(|w| w.word_number).collect();
    if sorted {
        numbers.sort_unstable();
    }
    numbers
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn require_attempt(attempt_id: &str) -> Result<(), ResultValidationError> {
    if attempt_id.trim().is_empty() {
        Err(ResultValidationError::EmptyAttemptId)
    } else {
        Ok(())
    }
}

impl MistapSubmission {
    /// Idempotency key: title, range, sorted misses, and attempt.
    ///
    /// # Examples
    /// ```
    /// use edulens::domain::results::MistapSubmission;
    ///
    /// let submission = MistapSubmission {
    ///     selected_text: Some("LEAP - 1-50".into()),
    ///     start_num: Some(1),
    ///     end_num: Some(50),
    ///     total: 10,
    ///     incorrect_words: vec![],
    ///     correct_words: vec![],
    ///     attempt_id: "a1".into(),
    /// };
    /// assert_eq!(submission.test_key(), "LEAP - 1-50::1::50::::a1");
    /// ```
    pub fn test_key(&self) -> String {
        format!(
            "{}::{}::{}::{}::{}",
            self.selected_text.as_deref().unwrap_or(""),
            self.start_num.map(|n| n.to_string()).unwrap_or_default(),
            self.end_num.map(|n| n.to_string()).unwrap_or_default(),
            join_numbers(&self.incorrect_words, true),
            self.attempt_id,
        )
    }

    /// Validate and build the stored row.
    pub fn into_new_result(self, user_id: UserId) -> Result<NewQuizResult, ResultValidationError> {
        require_attempt(&self.attempt_id)?;
        if self.total < 0 {
            return Err(ResultValidationError::NegativeTotal);
        }
        let incorrect_count = count(self.incorrect_words.len());
        if incorrect_count > self.total {
            return Err(ResultValidationError::TooManyIncorrect);
        }
        if matches!((self.start_num, self.end_num), (Some(start), Some(end)) if start > end) {
            return Err(ResultValidationError::InvertedRange);
        }

        let raw_title = self.selected_text.clone().unwrap_or_default();
        let test_key = self.test_key();
        Ok(NewQuizResult {
            user_id,
            selected_text: normalize_textbook_name(&raw_title),
            unit: derive_unit(&raw_title),
            start_num: self.start_num,
            end_num: self.end_num,
            total: self.total,
            correct: self.total - incorrect_count,
            incorrect_count,
            incorrect_words: self.incorrect_words,
            correct_words: self.correct_words,
            test_key,
            mode: ResultMode::Mistap.as_tag().map(str::to_owned),
        })
    }
}

impl MathtapSubmission {
    /// Idempotency key: grade, unit, misses in answer order, and attempt.
    pub fn test_key(&self) -> String {
        format!(
            "Mathtap:{}:{}:{}:{}",
            self.grade,
            self.unit,
            join_numbers(&self.incorrect, false),
            self.attempt_id,
        )
    }

    /// Validate and build the stored row.
    pub fn into_new_result(self, user_id: UserId) -> Result<NewQuizResult, ResultValidationError> {
        require_attempt(&self.attempt_id)?;
        if self.total < 0 {
            return Err(ResultValidationError::NegativeTotal);
        }
        let incorrect_count = count(self.incorrect.len());
        if incorrect_count > self.total {
            return Err(ResultValidationError::TooManyIncorrect);
        }
        let test_key = self.test_key();
        Ok(NewQuizResult {
            user_id,
            selected_text: format!("Mathtap: {}", self.grade),
            unit: Some(self.unit),
            start_num: None,
            end_num: None,
            total: self.total,
            correct: self.correct.clamp(0, self.total),
            incorrect_count,
            incorrect_words: self.incorrect,
            correct_words: Vec::new(),
            test_key,
            mode: ResultMode::Mathtap.as_tag().map(str::to_owned),
        })
    }
}
