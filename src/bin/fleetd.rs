//! Fleet daemon: serves the infrastructure REST facade and probes instance
//! health in the background.
//!
//! Usage:
//!
//! ```text
//! fleetd [config.yaml]
//! ```
//!
//! Without a configuration file the daemon runs on defaults and
//! `FLEETWRIGHT_` environment overrides. Without `database.url` state is
//! kept in memory. The `PostgreSQL` schema lives under `migrations/` and is
//! applied with the Diesel CLI.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use fleetwright::api::{ApiState, ServiceSettings, build_router};
use fleetwright::config::FleetConfig;
use fleetwright::infrastructure::{
    adapters::{
        connectors::{RusshClient, TransportConnectorFactory},
        memory::{InMemoryInfrastructureStore, InMemoryPluginCatalog, SlugComponentLoader},
        postgres::PostgresInfrastructureStore,
    },
    ports::InfrastructureStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn build_store(config: &FleetConfig) -> Result<Arc<dyn InfrastructureStore>, BoxError> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("no database configured; state is kept in memory");
        return Ok(Arc::new(InMemoryInfrastructureStore::new()));
    };
    let pool = Pool::builder()
        .max_size(config.database.pool_size)
        .build(ConnectionManager::<PgConnection>::new(url))?;
    info!(pool_size = config.database.pool_size, "connected to PostgreSQL");
    Ok(Arc::new(PostgresInfrastructureStore::new(pool)))
}

async fn shutdown_signal(trigger: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown requested");
    if trigger.send(true).is_err() {
        warn!("background tasks already stopped");
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = FleetConfig::load(config_path.as_deref())?;
    fleetwright::telemetry::init(&config.logging);

    let store = build_store(&config)?;
    let factory = Arc::new(TransportConnectorFactory::new(
        Arc::new(RusshClient::new(config.ssh.connect_timeout())),
        config.docker.request_timeout(),
    )?);
    let catalog = Arc::new(InMemoryPluginCatalog::new(
        config.marketplace.plugins.iter().cloned(),
    ));
    let loader = Arc::new(SlugComponentLoader::new(
        &config.marketplace.component_base_url,
    ));
    let state = ApiState::new(
        store,
        factory,
        catalog,
        loader,
        ServiceSettings::from(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = config.health.enabled.then(|| {
        let health = Arc::clone(&state.health);
        let interval = config.health.interval();
        tokio::spawn(async move { health.run(interval, shutdown_rx).await })
    });

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(address = %config.server.bind, "fleetd listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Some(handle) = monitor {
        handle.await?;
    }
    info!("fleetd stopped");
    Ok(())
}
