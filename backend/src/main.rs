//! CRM backend entry-point: loads settings, selects storage, and serves the
//! REST API with health probes and (in debug builds) OpenAPI docs.

mod server;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crm_backend::inbound::http::health::HealthState;
use crm_backend::inbound::http::session_config::fingerprint::key_fingerprint;
use crm_backend::inbound::http::session_config::{session_settings, BuildMode};
use crm_backend::outbound::persistence::{run_pending_migrations, DbPool, PoolConfig};
use ortho_config::OrthoConfig;

use server::{create_server, AppSettings, ServerConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}

async fn build_config(settings: &AppSettings) -> std::io::Result<ServerConfig> {
    let session = session_settings(&settings.session_toggles(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        "session signing key loaded"
    );

    let config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        settings.bind_addr()?,
    )
    .with_policy(settings.alert_policy())
    .with_metrics_window_days(settings.metrics_window_days());

    let Some(database_url) = settings.database_url.as_deref() else {
        warn!("database_url not set; deals are kept in memory and lost on restart");
        return Ok(config);
    };

    if settings.run_migrations {
        run_pending_migrations(database_url)
            .await
            .map_err(std::io::Error::other)?;
    }
    let pool = DbPool::new(
        PoolConfig::new(database_url)
            .with_max_size(settings.db_max_connections())
            .with_checkout_timeout(settings.db_checkout_timeout()),
    )
    .await
    .map_err(std::io::Error::other)?;
    Ok(config.with_db_pool(pool))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let settings =
        AppSettings::load().map_err(|err| std::io::Error::other(err.to_string()))?;
    let config = build_config(&settings).await?;
    let storage = config.storage().kind();
    let health_state = web::Data::new(HealthState::new(storage));

    info!(storage, bind_addr = ?settings.bind_addr()?, "starting CRM backend");
    create_server(health_state, config)?.await
}
