//! Saving and listing quiz results.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::domain::ports::ResultRepository;
use crate::domain::results::{
    MathtapSubmission, MistapSubmission, NewQuizResult, QuizResult, ResultValidationError,
};
use crate::domain::{Error, UserId};

/// A result submission from either product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSubmission {
    Mistap(MistapSubmission),
    Mathtap(MathtapSubmission),
}

fn map_validation_error(error: &ResultValidationError) -> Error {
    let (field, code) = match error {
        ResultValidationError::EmptyAttemptId => ("attemptId", "missing_field"),
        ResultValidationError::NegativeTotal => ("total", "out_of_range"),
        ResultValidationError::TooManyIncorrect => ("incorrectWords", "out_of_range"),
        ResultValidationError::InvertedRange => ("startNum", "invalid_range"),
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": code,
    }))
}

/// Result use-cases.
#[derive(Clone)]
pub struct ResultsService {
    results: Arc<dyn ResultRepository>,
}

impl ResultsService {
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Store a result. Resubmitting the same attempt overwrites it.
    pub async fn save(
        &self,
        user_id: UserId,
        submission: ResultSubmission,
    ) -> Result<QuizResult, Error> {
        let row: NewQuizResult = match submission {
            ResultSubmission::Mistap(s) => s.into_new_result(user_id),
            ResultSubmission::Mathtap(s) => s.into_new_result(user_id),
        }
        .map_err(|err| map_validation_error(&err))?;

        let saved = self.results.upsert(&row).await?;
        debug!(result_id = %saved.id, test_key = %saved.test_key, "quiz result saved");
        Ok(saved)
    }

    /// The caller's results, newest first.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<QuizResult>, Error> {
        Ok(self.results.list_for_user(user_id).await?)
    }
}
