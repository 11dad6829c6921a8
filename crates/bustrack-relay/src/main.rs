//! Relay binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`bustrack.yaml` or `BUSTRACK_CONFIG`, then env)
//! 2. Initialize structured logging (tracing)
//! 3. Build the relay core and route catalog
//! 4. Serve until `Ctrl-C`

use std::sync::Arc;

use anyhow::Context;
use bustrack_core::{LogFormat, LoggingConfig, RelayConfig};
use bustrack_relay::{start_server, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot bind.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration. Logging is not up yet, so failures surface
    //    through the returned error.
    let config = RelayConfig::load().context("failed to load relay configuration")?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        address = %config.server.address(),
        ordering = ?config.ingest.ordering,
        "Bustrack relay starting"
    );

    // 3. Relay core.
    let state = Arc::new(AppState::new(config.ingest.ordering));
    info!(
        routes = state.catalog.routes.len(),
        buses = state.catalog.buses().count(),
        "Route catalog loaded"
    );

    // 4. Serve.
    start_server(&config.server, state, shutdown_signal())
        .await
        .context("relay server failed")?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, running until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}
