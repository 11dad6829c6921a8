//! Relay HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address; [`serve`] runs on an
//! already-bound listener, which tests use with port `0`. Both return once
//! the `shutdown` future resolves and in-flight connections have drained.

use std::future::Future;
use std::sync::Arc;

use bustrack_core::ServerConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Bind to `config` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the host does not resolve, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {}: {e}", config.address())))?;

    serve(listener, state, shutdown).await
}

/// Serve the relay router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server encounters a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("listener has no local address: {e}")))?;
    let router = build_router(state);

    info!(%addr, "Relay server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Relay server stopped");
    Ok(())
}

/// Errors that can occur when starting or running the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_by_host_name() {
        let config = ServerConfig {
            host: String::from("localhost"),
            port: 0,
        };
        start_server(&config, Arc::new(AppState::default()), async {})
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_bind_error() {
        let config = ServerConfig {
            host: String::from("no such host"),
            port: 0,
        };
        let err = start_server(&config, Arc::new(AppState::default()), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind(_)));
    }
}
