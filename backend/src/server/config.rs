//! Application settings and the HTTP server configuration built from them.

use std::fmt;
use std::net::SocketAddr;

use edulens::outbound::persistence::DbPool;
use ortho_config::OrthoConfig;
use serde::Deserialize;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_APP_URL: &str = "https://mistap.jp";
const DEFAULT_STUDENT_EMAIL_DOMAIN: &str = "@student.edulens.jp";

/// Deployment settings read from `EDULENS_*` variables and CLI flags.
///
/// Every external service is optional; a missing credential selects the
/// matching offline adapter.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "EDULENS")]
pub struct AppSettings {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub microcms_service_domain: Option<String>,
    pub microcms_api_key: Option<String>,
    pub microcms_webhook_secret: Option<String>,
    /// Public base URL used in redirects.
    pub app_url: Option<String>,
    /// Suffix turning a student login id into an email address.
    pub student_email_domain: Option<String>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub migrate_on_start: bool,
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |value: &Option<String>| value.is_some();
        f.debug_struct("AppSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database", &set(&self.database_url))
            .field("redis", &set(&self.redis_url))
            .field("gemini", &set(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("supabase_url", &self.supabase_url)
            .field("stripe", &set(&self.stripe_secret_key))
            .field("microcms_service_domain", &self.microcms_service_domain)
            .field("app_url", &self.app_url)
            .field("migrate_on_start", &self.migrate_on_start)
            .finish_non_exhaustive()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns an error when the configured address is not `host:port`.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let raw = non_blank(&self.bind_addr).unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address {raw}: {err}"),
            )
        })
    }

    pub fn app_url(&self) -> &str {
        non_blank(&self.app_url).unwrap_or(DEFAULT_APP_URL)
    }

    pub fn student_email_domain(&self) -> &str {
        non_blank(&self.student_email_domain).unwrap_or(DEFAULT_STUDENT_EMAIL_DOMAIN)
    }

    pub fn database_url(&self) -> Option<&str> {
        non_blank(&self.database_url)
    }

    pub fn redis_url(&self) -> Option<&str> {
        non_blank(&self.redis_url)
    }

    pub(crate) fn gemini_api_key(&self) -> Option<&str> {
        non_blank(&self.gemini_api_key)
    }

    pub(crate) fn microcms_webhook_secret(&self) -> Option<&str> {
        non_blank(&self.microcms_webhook_secret)
    }
}

/// Everything the server factory needs beyond the settings.
pub struct ServerConfig {
    pub(crate) settings: AppSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) redis: Option<bb8_redis::bb8::Pool<bb8_redis::RedisConnectionManager>>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// # Errors
    /// Returns an error when the bind address does not parse.
    pub fn new(settings: AppSettings) -> std::io::Result<Self> {
        Ok(Self {
            bind_addr: settings.bind_addr()?,
            settings,
            db_pool: None,
            redis: None,
            #[cfg(feature = "metrics")]
            prometheus: None,
        })
    }

    /// Attach a database connection pool for persistence adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach a Redis pool for the shared rate limiter.
    #[must_use]
    pub fn with_redis(
        mut self,
        pool: bb8_redis::bb8::Pool<bb8_redis::RedisConnectionManager>,
    ) -> Self {
        self.redis = Some(pool);
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
