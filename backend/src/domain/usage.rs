//! Background usage counters.
//!
//! Counting a writing check must not delay the grading response, so the
//! increment runs on a spawned task. It is retried once; a task lost to a
//! crash is accepted and the failure is logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::grading::{Sleeper, TokioSleeper};
use crate::domain::ports::ProfileRepository;
use crate::domain::{TraceId, UserId};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Spawns counter updates off the request path.
#[derive(Clone)]
pub struct UsageRecorder {
    profiles: Arc<dyn ProfileRepository>,
    sleeper: Arc<dyn Sleeper>,
}

impl UsageRecorder {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self::with_sleeper(profiles, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(profiles: Arc<dyn ProfileRepository>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { profiles, sleeper }
    }

    /// Count one writing check for `user_id` in the background.
    ///
    /// The task keeps the caller's trace id so its logs correlate with the
    /// request.
    pub fn record_writing_check(&self, user_id: UserId) -> JoinHandle<bool> {
        let profiles = Arc::clone(&self.profiles);
        let sleeper = Arc::clone(&self.sleeper);
        let work = async move {
            for attempt in 1..=2_u32 {
                match profiles.increment_writing_checks(&user_id).await {
                    Ok(()) => {
                        debug!(%user_id, attempt, "writing check counted");
                        return true;
                    }
                    Err(err) if attempt == 1 => {
                        warn!(%user_id, error = %err, "writing check count failed; retrying");
                        sleeper.sleep(RETRY_DELAY).await;
                    }
                    Err(err) => {
                        error!(%user_id, error = %err, "writing check count lost");
                    }
                }
            }
            false
        };
        match TraceId::current() {
            Some(trace_id) => tokio::spawn(TraceId::scope(trace_id, work)),
            None => tokio::spawn(work),
        }
    }
}
