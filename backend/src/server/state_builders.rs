//! Builders selecting a real or offline adapter for every HTTP state port.
//!
//! A port gets its network adapter when the settings carry the credentials
//! it needs; otherwise the offline stand-in is used and a warning names the
//! missing configuration.

use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use reqwest::Url;
use tracing::{info, warn};
use zeroize::Zeroizing;

use edulens::domain::content_service::CachePolicy;
use edulens::domain::ports::{
    AuthGateway, ContentSource, DisabledPaymentGateway, DocumentFetcher, EmptyContentSource,
    FixtureAuthGateway, FixtureModelClient, ModelClient, OfflineDocumentFetcher, PaymentGateway,
    RateLimiter,
};
use edulens::inbound::http::state::{HttpState, HttpStatePorts, HttpStateSettings};
use edulens::outbound::document_fetcher::HttpDocumentFetcher;
use edulens::outbound::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiHttpClient};
use edulens::outbound::memory::{
    InMemoryAnnouncementRepository, InMemoryCommunityRepository, InMemoryExamCalendarRepository,
    InMemoryGroupRepository, InMemoryProfileRepository, InMemoryResultRepository,
    InMemorySchoolRepository, InMemorySubjectRepository,
};
use edulens::outbound::microcms::MicroCmsSource;
use edulens::outbound::persistence::{
    DbPool, DieselAnnouncementRepository, DieselCommunityRepository,
    DieselExamCalendarRepository, DieselGroupRepository, DieselProfileRepository, DieselResultRepository, DieselSchoolRepository,
    DieselSubjectRepository,
};
use edulens::outbound::rate_limit::{InMemoryRateLimiter, RedisRateLimiter};
use edulens::outbound::stripe::{StripeHttpGateway, StripeSettings};
use edulens::outbound::supabase::SupabaseAuthGateway;

use super::config::{AppSettings, ServerConfig};

/// Grading calls carry images and can run long.
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// Guideline PDFs can be several megabytes.
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

fn secret(value: &str) -> Zeroizing<String> {
    Zeroizing::new(value.to_owned())
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn build_auth(settings: &AppSettings) -> Arc<dyn AuthGateway> {
    let (Some(url), Some(anon_key)) = (
        present(settings.supabase_url.as_ref()),
        present(settings.supabase_anon_key.as_ref()),
    ) else {
        warn!("supabase is not configured; every caller is a guest");
        return Arc::new(FixtureAuthGateway);
    };
    let base_url = match Url::parse(url) {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, "invalid supabase url; every caller is a guest");
            return Arc::new(FixtureAuthGateway);
        }
    };
    let service_role = present(settings.supabase_service_role_key.as_ref()).map(secret);
    if service_role.is_none() {
        warn!("supabase service role key missing; student provisioning is disabled");
    }
    match SupabaseAuthGateway::new(base_url, secret(anon_key), service_role, PROVIDER_TIMEOUT) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            warn!(error = %err, "supabase client failed to build; every caller is a guest");
            Arc::new(FixtureAuthGateway)
        }
    }
}

fn build_model(settings: &AppSettings) -> Arc<dyn ModelClient> {
    let Some(api_key) = settings.gemini_api_key() else {
        warn!("gemini api key missing; using canned model replies");
        return Arc::new(FixtureModelClient);
    };
    let model = present(settings.gemini_model.as_ref()).unwrap_or(DEFAULT_GEMINI_MODEL);
    let base = present(settings.gemini_base_url.as_ref()).unwrap_or(DEFAULT_GEMINI_BASE_URL);
    let client = Url::parse(base)
        .map_err(|err| err.to_string())
        .and_then(|base| {
            GeminiHttpClient::new(&base, model, secret(api_key), MODEL_TIMEOUT)
                .map_err(|err| err.to_string())
        });
    match client {
        Ok(client) => {
            info!(%model, "gemini model client configured");
            Arc::new(client)
        }
        Err(error) => {
            warn!(%error, "gemini client failed to build; using canned model replies");
            Arc::new(FixtureModelClient)
        }
    }
}

fn build_payments(settings: &AppSettings, clock: Arc<dyn Clock>) -> Arc<dyn PaymentGateway> {
    let (Some(secret_key), Some(price_id), Some(webhook_secret)) = (
        present(settings.stripe_secret_key.as_ref()),
        present(settings.stripe_price_id.as_ref()),
        present(settings.stripe_webhook_secret.as_ref()),
    ) else {
        warn!("stripe is not configured; billing endpoints answer 503");
        return Arc::new(DisabledPaymentGateway);
    };
    let stripe = StripeSettings {
        secret_key: secret(secret_key),
        price_id: price_id.to_owned(),
        webhook_secret: secret(webhook_secret),
    };
    match StripeHttpGateway::new(stripe, clock, PROVIDER_TIMEOUT) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            warn!(error = %err, "stripe client failed to build; billing disabled");
            Arc::new(DisabledPaymentGateway)
        }
    }
}

fn build_content(settings: &AppSettings) -> Arc<dyn ContentSource> {
    let (Some(domain), Some(api_key)) = (
        present(settings.microcms_service_domain.as_ref()),
        present(settings.microcms_api_key.as_ref()),
    ) else {
        warn!("microcms is not configured; the blog is empty");
        return Arc::new(EmptyContentSource);
    };
    match MicroCmsSource::new(domain, secret(api_key), PROVIDER_TIMEOUT) {
        Ok(source) => Arc::new(source),
        Err(err) => {
            warn!(error = %err, "microcms client failed to build; the blog is empty");
            Arc::new(EmptyContentSource)
        }
    }
}

fn build_documents() -> Arc<dyn DocumentFetcher> {
    match HttpDocumentFetcher::new(DOCUMENT_TIMEOUT) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(err) => {
            warn!(error = %err, "document client failed to build; exam import disabled");
            Arc::new(OfflineDocumentFetcher)
        }
    }
}

fn build_rate_limiter(config: &ServerConfig, clock: Arc<dyn Clock>) -> Arc<dyn RateLimiter> {
    match &config.redis {
        Some(pool) => Arc::new(RedisRateLimiter::new(pool.clone(), clock)),
        None => {
            warn!("redis is not configured; rate limits are per process");
            Arc::new(InMemoryRateLimiter::new(clock))
        }
    }
}

/// Repository ports, backed by Postgres when a pool exists.
fn repository_ports(pool: Option<&DbPool>, ports: &mut HttpStatePorts) {
    let Some(pool) = pool else {
        warn!("no database configured; data lives in memory until restart");
        return;
    };
    ports.profiles = Arc::new(DieselProfileRepository::new(pool.clone()));
    ports.results = Arc::new(DieselResultRepository::new(pool.clone()));
    ports.groups = Arc::new(DieselGroupRepository::new(pool.clone()));
    ports.announcements = Arc::new(DieselAnnouncementRepository::new(pool.clone()));
    ports.community = Arc::new(DieselCommunityRepository::new(pool.clone()));
    ports.subjects = Arc::new(DieselSubjectRepository::new(pool.clone()));
    ports.school = Arc::new(DieselSchoolRepository::new(pool.clone()));
    ports.exam_calendar = Arc::new(DieselExamCalendarRepository::new(pool.clone()));
}

/// Assemble the handler state for `config`.
pub(crate) fn build_http_state(config: &ServerConfig) -> HttpState {
    let settings = &config.settings;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let mut ports = HttpStatePorts {
        auth: build_auth(settings),
        profiles: Arc::new(InMemoryProfileRepository::default()),
        results: Arc::new(InMemoryResultRepository::new(clock.clone())),
        groups: Arc::new(InMemoryGroupRepository::default()),
        announcements: Arc::new(InMemoryAnnouncementRepository::default()),
        community: Arc::new(InMemoryCommunityRepository::default()),
        subjects: Arc::new(InMemorySubjectRepository::default()),
        school: Arc::new(InMemorySchoolRepository::default()),
        exam_calendar: Arc::new(InMemoryExamCalendarRepository::default()),
        documents: build_documents(),
        rate_limiter: build_rate_limiter(config, clock.clone()),
        model: build_model(settings),
        payments: build_payments(settings, clock.clone()),
        content: build_content(settings),
        clock: clock.clone(),
    };
    repository_ports(config.db_pool.as_ref(), &mut ports);

    let state_settings = HttpStateSettings {
        app_url: settings.app_url().to_owned(),
        student_email_domain: settings.student_email_domain().to_owned(),
        revalidate_secret: settings.microcms_webhook_secret().map(str::to_owned),
        cache_policy: CachePolicy::default(),
    };
    HttpState::new(ports, state_settings)
}
