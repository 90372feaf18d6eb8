//! Process-local sliding-window limiter.
//!
//! Keys are client addresses and guest cookies, so the map is swept every
//! [`SWEEP_INTERVAL`] hits and keys whose newest hit has left its window are
//! dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;

use crate::domain::ports::{RateLimitDecision, RateLimitRule, RateLimiter, RateLimiterError};

use super::{bucket_key, window_millis};

/// Hits between sweeps of expired keys.
pub(crate) const SWEEP_INTERVAL: u32 = 64;

struct Bucket {
    hits: VecDeque<DateTime<Utc>>,
    window: Duration,
}

impl Bucket {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.hits
            .back()
            .is_some_and(|newest| *newest > now - self.window)
    }
}

#[derive(Default)]
struct Buckets {
    by_key: HashMap<String, Bucket>,
    until_sweep: u32,
}

impl Buckets {
    fn sweep_if_due(&mut self, now: DateTime<Utc>) {
        if self.until_sweep > 0 {
            self.until_sweep -= 1;
            return;
        }
        self.until_sweep = SWEEP_INTERVAL - 1;
        let before = self.by_key.len();
        self.by_key.retain(|_, bucket| bucket.is_live(now));
        tracing::debug!(evicted = before - self.by_key.len(), "rate limit keys swept");
    }
}

/// Hit log per key, oldest first.
pub struct InMemoryRateLimiter {
    buckets: Mutex<Buckets>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Limiter reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                by_key: HashMap::new(),
                until_sweep: SWEEP_INTERVAL - 1,
            }),
            clock,
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn hit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> Result<RateLimitDecision, RateLimiterError> {
        let now = self.clock.utc();
        let window = Duration::milliseconds(window_millis(rule));
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets.sweep_if_due(now);

        let key = bucket_key(rule, identifier);
        let bucket = buckets.by_key.entry(key.clone()).or_insert_with(|| Bucket {
            hits: VecDeque::new(),
            window,
        });
        bucket.window = window;
        let log = &mut bucket.hits;

        while log.front().is_some_and(|oldest| *oldest <= now - window) {
            log.pop_front();
        }

        let limit = usize::try_from(rule.limit).unwrap_or(usize::MAX);
        let allowed = log.len() < limit;
        if allowed {
            log.push_back(now);
        }
        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        let reset_at = log.front().map_or(now + window, |oldest| *oldest + window);
        if log.is_empty() {
            buckets.by_key.remove(&key);
        }

        Ok(RateLimitDecision {
            allowed,
            limit: rule.limit,
            remaining: rule.limit.saturating_sub(used),
            reset_at,
        })
    }
}
