//! Plan-tiered usage quotas.
//!
//! Basic analysis is metered per day: Pro is unlimited, signed-in users are
//! counted by user id, and guests by client IP. The chat endpoint has a
//! per-minute burst guard for everyone plus daily limits on image questions;
//! guests are counted by cookie and by IP, and exceeding either blocks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use super::ports::{RateLimitDecision, RateLimitRule, RateLimiter, RateLimiterError};
use super::{Error, PlanTier, UserId, Viewer};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const MINUTE: Duration = Duration::from_secs(60);

pub const ANALYSIS_FREE: RateLimitRule = RateLimitRule::new("analysis_free", 3, DAY);
pub const ANALYSIS_GUEST: RateLimitRule = RateLimitRule::new("analysis_guest", 1, DAY);
pub const CHAT_BURST: RateLimitRule = RateLimitRule::new("naruhodo_burst", 10, MINUTE);
pub const CHAT_PRO: RateLimitRule = RateLimitRule::new("naruhodo_pro", 20, DAY);
pub const CHAT_FREE: RateLimitRule = RateLimitRule::new("naruhodo_free", 2, DAY);
pub const CHAT_GUEST_COOKIE: RateLimitRule = RateLimitRule::new("naruhodo_guest_cookie", 1, DAY);
pub const CHAT_GUEST_IP: RateLimitRule = RateLimitRule::new("naruhodo_guest_ip", 1, DAY);

pub const ANALYSIS_FREE_MESSAGE: &str =
    "本日の利用回数（3回）を超えました。Proプランにアップグレードすると無制限で利用できます。";
pub const ANALYSIS_GUEST_MESSAGE: &str =
    "本日の利用回数（1回・お試し）を超えました。ログインすると1日3回まで利用できます。";
pub const CHAT_BURST_MESSAGE: &str = "Too Many Requests (Burst Limit)";
pub const CHAT_PRO_MESSAGE: &str = "今日の質問回数はおしまいだよ！また明日質問してね！";

/// Identity a chat question is metered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMeter<'a> {
    Pro(UserId),
    Free(UserId),
    Guest { guest_id: &'a str, client_ip: &'a str },
}

/// Applies quota rules through a [`RateLimiter`].
#[derive(Clone)]
pub struct QuotaService {
    limiter: Arc<dyn RateLimiter>,
    app_url: String,
}

impl QuotaService {
    /// `app_url` is the public base URL used in upgrade links.
    pub fn new(limiter: Arc<dyn RateLimiter>, app_url: impl Into<String>) -> Self {
        let app_url = app_url.into();
        Self {
            limiter,
            app_url: app_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Meter one basic analysis.
    pub async fn check_analysis(&self, viewer: Option<&Viewer>, client_ip: &str) -> Result<(), Error> {
        match (PlanTier::for_viewer(viewer), viewer) {
            (PlanTier::Pro, _) => Ok(()),
            (PlanTier::Free, Some(viewer)) => {
                let id = viewer.user_id.to_string();
                self.enforce(&ANALYSIS_FREE, &id, ANALYSIS_FREE_MESSAGE).await
            }
            _ => {
                self.enforce(&ANALYSIS_GUEST, client_ip, ANALYSIS_GUEST_MESSAGE)
                    .await
            }
        }
    }

    /// Per-minute guard applied to every chat request.
    pub async fn check_chat_burst(&self, client_ip: &str) -> Result<(), Error> {
        self.enforce(&CHAT_BURST, client_ip, CHAT_BURST_MESSAGE).await
    }

    /// Meter one image question in chat.
    pub async fn check_chat_question(&self, meter: &ChatMeter<'_>) -> Result<(), Error> {
        match meter {
            ChatMeter::Pro(id) => {
                self.enforce(&CHAT_PRO, &id.to_string(), CHAT_PRO_MESSAGE)
                    .await
            }
            ChatMeter::Free(id) => {
                self.enforce(&CHAT_FREE, &id.to_string(), &self.chat_free_message())
                    .await
            }
            ChatMeter::Guest {
                guest_id,
                client_ip,
            } => {
                let (by_cookie, by_ip) = tokio::join!(
                    self.hit(&CHAT_GUEST_COOKIE, guest_id),
                    self.hit(&CHAT_GUEST_IP, client_ip),
                );
                let (by_cookie, by_ip) = (by_cookie?, by_ip?);
                let blocking = [by_cookie, by_ip].into_iter().find(|d| !d.allowed);
                match blocking {
                    None => Ok(()),
                    Some(decision) => Err(blocked(&self.chat_guest_message(), &decision)),
                }
            }
        }
    }

    /// Shown to free users who run out of chat questions.
    pub fn chat_free_message(&self) -> String {
        format!(
            "今日の無料回数はおしまいだよ！Proアカウントに変更で1日20問まで質問できるよ！\n\n👉 Proプランはこちら: {}/upgrade?source=naruhodo",
            self.app_url
        )
    }

    /// Shown to guests who run out of chat questions.
    pub fn chat_guest_message(&self) -> String {
        format!(
            "今日の無料回数はおしまいだよ！ログインすると1日2回まで質問できるよ！\n\n👉 [今すぐ新規登録]({}/login?mode=signup&redirect=%2Fnaruhodo-lens)",
            self.app_url
        )
    }

    async fn enforce(&self, rule: &RateLimitRule, identifier: &str, message: &str) -> Result<(), Error> {
        let decision = self.hit(rule, identifier).await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(blocked(message, &decision))
        }
    }

    async fn hit(&self, rule: &RateLimitRule, identifier: &str) -> Result<RateLimitDecision, Error> {
        let decision = self
            .limiter
            .hit(rule, identifier)
            .await
            .map_err(map_limiter_error)?;
        debug!(
            prefix = rule.prefix,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "quota checked"
        );
        Ok(decision)
    }
}

fn blocked(message: &str, decision: &RateLimitDecision) -> Error {
    Error::too_many_requests(message).with_details(json!({
        "limit": decision.limit,
        "remaining": decision.remaining,
        "resetAt": decision.reset_at.to_rfc3339(),
    }))
}

fn map_limiter_error(error: RateLimiterError) -> Error {
    warn!(%error, "rate limiter failed");
    Error::service_unavailable("usage limits are temporarily unavailable")
}
