//! Port for sliding-window rate limiting.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;

define_port_error! {
    /// Errors raised by limiter backends.
    pub enum RateLimiterError {
        /// Backend could not be reached.
        Unavailable { message: String } => "rate limiter unavailable: {message}",
        /// Backend answered with something unexpected.
        Backend { message: String } => "rate limiter backend failed: {message}",
    }
}

/// A named limit over a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Key namespace; identifiers are counted per prefix.
    pub prefix: &'static str,
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    /// Build a rule.
    pub const fn new(prefix: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            prefix,
            limit,
            window,
        }
    }
}

/// Outcome of one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest counted hit leaves the window.
    pub reset_at: DateTime<Utc>,
}

/// Sliding-window counter.
///
/// A hit is recorded only when it is allowed, so blocked callers do not
/// extend their own lockout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a hit for `identifier` under `rule`.
    async fn hit(
        &self,
        rule: &RateLimitRule,
        identifier: &str,
    ) -> Result<RateLimitDecision, RateLimiterError>;
}
