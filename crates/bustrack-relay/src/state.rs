//! Shared application state for the relay server.
//!
//! [`AppState`] bundles the relay core (store, hub, ingestor) with the
//! read-only route catalog. It is wrapped in [`Arc`] and injected into
//! every handler through Axum's `State` extractor.

use std::sync::Arc;

use bustrack_core::{IngestOrdering, Relay};
use bustrack_types::Catalog;
use chrono::{DateTime, Utc};

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Store, hub, and ingestor.
    pub relay: Relay,
    /// Route/stop/bus reference data served by `/api/routes`.
    pub catalog: Arc<Catalog>,
    /// When this relay instance started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state with an empty store and the demo catalog.
    pub fn new(ordering: IngestOrdering) -> Self {
        Self::with_catalog(Relay::new(ordering), Catalog::demo())
    }

    /// Create state around an existing relay core and catalog.
    pub fn with_catalog(relay: Relay, catalog: Catalog) -> Self {
        Self {
            relay,
            catalog: Arc::new(catalog),
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since start.
    pub fn uptime_seconds(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(IngestOrdering::default())
    }
}
