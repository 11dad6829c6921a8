//! Relay server for Bustrack.
//!
//! An Axum HTTP server that sits between driver devices and map viewers:
//!
//! - **`WebSocket` endpoints** (`/ws`, `/ws/ingest`) carrying the
//!   `busLocation` / `busLocations` / `error` frames
//! - **REST endpoints** for the current fleet, one-shot reports, the route
//!   catalog, and relay status
//! - **Minimal HTML page** (`GET /`) listing tracked vehicles
//!
//! # Architecture
//!
//! All synchronization lives in [`bustrack_core::Relay`]. This crate only
//! moves frames between sockets and the core: inbound text frames go to the
//! ingestor, and each socket's hub subscription is drained into outbound
//! frames. A slow socket only ever delays itself.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::RelayError;
pub use router::build_router;
pub use server::{serve, start_server, ServerError};
pub use state::AppState;
