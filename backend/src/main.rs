//! Backend entry-point: loads settings, connects storage, and serves the API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use edulens::inbound::http::health::HealthState;
use edulens::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use edulens::outbound::rate_limit::connect_redis;
use server::{AppSettings, ServerConfig, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("failed to load EDULENS settings")?;
    info!(?settings, "settings loaded");

    let database_url = settings.database_url().map(str::to_owned);
    let redis_url = settings.redis_url().map(str::to_owned);
    let migrate_on_start = settings.migrate_on_start;
    let mut config = ServerConfig::new(settings)?;

    if let Some(url) = database_url {
        if migrate_on_start {
            let applied = run_migrations(&url)
                .await
                .wrap_err("database migrations failed")?;
            info!(applied, "database migrations applied");
        }
        let pool = DbPool::new(PoolConfig::new(url))
            .await
            .wrap_err("database pool could not be built")?;
        config = config.with_db_pool(pool);
    }

    if let Some(url) = redis_url {
        match connect_redis(&url).await {
            Ok(pool) => config = config.with_redis(pool),
            Err(err) => warn!(error = %err, "redis unavailable; rate limits are per process"),
        }
    }

    #[cfg(feature = "metrics")]
    let config = config.with_metrics(server::build_metrics());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("server terminated with an error")
}
