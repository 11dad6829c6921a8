//! Real-time position synchronization engine for Bustrack.
//!
//! Three pieces, wired by explicit ownership rather than globals:
//!
//! - [`PositionStore`] -- latest state per vehicle, overwrite semantics
//! - [`BroadcastHub`] -- viewer sessions, hydration on subscribe, fan-out
//! - [`Ingestor`] -- validation plus the serialized apply-then-publish path
//!
//! ```text
//! producer report --> Ingestor --> PositionStore --> BroadcastHub --> viewers
//! ```
//!
//! The store is created first and shared by `Arc` with both the hub and the
//! ingestor; see [`Relay::new`].

pub mod config;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod store;

use std::sync::Arc;

pub use config::{IngestConfig, IngestOrdering, LogFormat, LoggingConfig, RelayConfig, ServerConfig};
pub use error::{ConfigError, IngestError, ValidationError};
pub use hub::{BroadcastHub, PublishReport, Subscription};
pub use ingest::{validate, IngestReceipt, IngestSource, Ingestor};
pub use store::{ApplyOutcome, PositionStore};

/// The store, hub, and ingestor of one relay instance.
#[derive(Debug, Clone)]
pub struct Relay {
    /// Latest position per vehicle.
    pub store: Arc<PositionStore>,
    /// Viewer fan-out.
    pub hub: Arc<BroadcastHub>,
    /// Write path for producer reports.
    pub ingestor: Arc<Ingestor>,
}

impl Relay {
    /// Build a fresh, empty relay core.
    pub fn new(ordering: IngestOrdering) -> Self {
        let store = Arc::new(PositionStore::new());
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&store)));
        let ingestor = Arc::new(Ingestor::new(Arc::clone(&store), Arc::clone(&hub), ordering));
        Self { store, hub, ingestor }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(IngestOrdering::default())
    }
}
