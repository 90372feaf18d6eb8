//! Redis sorted-set limiter.
//!
//! Each key is a ZSET of hit timestamps (milliseconds). A Lua script trims
//! the window, counts, and conditionally records the hit in one round trip so
//! concurrent servers cannot overshoot the limit.

use std::sync::Arc;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::{RedisError, Script};
use chrono::{DateTime, TimeZone, Utc};
use mockable::Clock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::{RateLimitDecision, RateLimitRule, RateLimiter, RateLimiterError};

use super::{bucket_key, window_millis};

const SLIDING_WINDOW_SCRIPT: &str = r"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local allowed = 0
if count < limit then
  redis.call('ZADD', key, now, ARGV[4])
  count = count + 1
  allowed = 1
end
redis.call('PEXPIRE', key, window)
local reset = now + window
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if oldest[2] then
  reset = tonumber(oldest[2]) + window
end
return {allowed, count, reset}
";

/// Open a pooled Redis connection manager for `url`.
///
/// # Errors
///
/// Returns an error when the URL is invalid or the pool cannot be built.
pub async fn connect_redis(url: &str) -> Result<Pool<RedisConnectionManager>, RateLimiterError> {
    let manager = RedisConnectionManager::new(url).map_err(map_redis_error)?;
    Pool::builder()
        .max_size(10)
        .build(manager)
        .await
        .map_err(map_redis_error)
}

/// Limiter shared by every server process through Redis.
pub struct RedisRateLimiter {
    pool: Pool<RedisConnectionManager>,
    script: Script,
    clock: Arc<dyn Clock>,
}

impl RedisRateLimiter {
    /// Limiter over an existing pool.
    pub fn new(pool: Pool<RedisConnectionManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
            clock,
        }
    }
}

fn map_redis_error(error: RedisError) -> RateLimiterError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
        RateLimiterError::unavailable(error.to_string())
    } else {
        RateLimiterError::backend(error.to_string())
    }
}

fn decision_from_reply(rule: &RateLimitRule, reply: &[i64]) -> Result<RateLimitDecision, RateLimiterError> {
    let [allowed, count, reset_ms] = reply else {
        return Err(RateLimiterError::backend(format!(
            "unexpected script reply of length {}",
            reply.len()
        )));
    };
    let reset_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(*reset_ms)
        .single()
        .ok_or_else(|| RateLimiterError::backend("reset timestamp out of range"))?;
    let used = u32::try_from(*count).unwrap_or(u32::MAX);
    Ok(RateLimitDecision {
        allowed: *allowed == 1,
        limit: rule.limit,
        remaining: rule.limit.saturating_sub(used),
        reset_at,
    })
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn hit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> Result<RateLimitDecision, RateLimiterError> {
        let mut conn = self.pool.get().await.map_err(|err| {
            warn!(error = %err, "redis checkout failed");
            RateLimiterError::unavailable(err.to_string())
        })?;
        let now_ms = self.clock.utc().timestamp_millis();
        let member = format!("{now_ms}-{}", Uuid::new_v4().simple());
        let reply: Vec<i64> = self
            .script
            .key(bucket_key(rule, identifier))
            .arg(now_ms)
            .arg(window_millis(rule))
            .arg(rule.limit)
            .arg(member)
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        let decision = decision_from_reply(rule, &reply)?;
        debug!(prefix = rule.prefix, allowed = decision.allowed, "rate limit hit");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const RULE: RateLimitRule = RateLimitRule::new("naruhodo_burst", 10, Duration::from_secs(60));

    #[test]
    fn decodes_script_reply() {
        let decision = decision_from_reply(&RULE, &[1, 4, 1_700_000_060_000]).expect("decodes");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 6);
        assert_eq!(decision.reset_at.timestamp(), 1_700_000_060);
    }

    #[test]
    fn rejects_short_reply() {
        assert!(matches!(
            decision_from_reply(&RULE, &[0, 10]),
            Err(RateLimiterError::Backend { .. })
        ));
    }
}
