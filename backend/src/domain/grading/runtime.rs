//! Retry machinery for model calls: sleeping, backoff policy, and the
//! generate-then-parse loop shared by grading and exam import.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ports::{ModelClient, ModelClientError, ModelPrompt};

use super::extract::ExtractError;

/// Async sleep used by retry loops, replaceable in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first.
    pub max_attempts: u32,
    /// Delay after attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after a failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error(transparent)]
    Model(#[from] ModelClientError),
    #[error(transparent)]
    Reply(#[from] ExtractError),
}

/// Every attempt failed; the individual failures were logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{mode}: no usable model reply after {attempts} attempts")]
pub struct GenerationExhausted {
    pub mode: &'static str,
    pub attempts: u32,
}

/// Model calls repeated until a reply parses.
#[derive(Clone)]
pub struct RetryingGenerator {
    model: Arc<dyn ModelClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RetryingGenerator {
    pub fn new(model: Arc<dyn ModelClient>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            model,
            sleeper,
            policy,
        }
    }

    /// Send `prompt` until `parse` accepts a reply or the policy runs out.
    ///
    /// `mode` labels the log events of each attempt.
    pub async fn generate<T, F>(
        &self,
        prompt: &ModelPrompt,
        mode: &'static str,
        parse: F,
    ) -> Result<T, GenerationExhausted>
    where
        F: Fn(&str) -> Result<T, ExtractError> + Send + Sync,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.attempt(prompt, &parse).await {
                Ok(parsed) => {
                    debug!(mode, attempt, "model reply accepted");
                    return Ok(parsed);
                }
                Err(failure) => {
                    warn!(mode, attempt, error = %failure, "model attempt failed");
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }
        Err(GenerationExhausted {
            mode,
            attempts: max_attempts,
        })
    }

    async fn attempt<T, F>(&self, prompt: &ModelPrompt, parse: &F) -> Result<T, AttemptFailure>
    where
        F: Fn(&str) -> Result<T, ExtractError> + Send + Sync,
        T: Send,
    {
        let reply = self.model.generate(prompt).await?;
        Ok(parse(&reply)?)
    }
}
