//! Sliding-window [`RateLimiter`](crate::domain::ports::RateLimiter) backends.
//!
//! Both backends keep a log of hit timestamps per `prefix:identifier` key and
//! only record hits that were allowed.

mod memory;
mod redis;

pub use memory::InMemoryRateLimiter;
pub use redis::{RedisRateLimiter, connect_redis};

use crate::domain::ports::RateLimitRule;

/// Storage key for one limited caller.
fn bucket_key(rule: &RateLimitRule, identifier: &str) -> String {
    format!("ratelimit:{}:{identifier}", rule.prefix)
}

fn window_millis(rule: &RateLimitRule) -> i64 {
    i64::try_from(rule.window.as_millis()).unwrap_or(i64::MAX)
}
