//! Relay link shared by the Bustrack driver and viewer binaries.
//!
//! - [`link`] -- background socket task with reconnect, outbound queue,
//!   and an event stream of connection changes and fleet snapshots
//! - [`config`] -- relay URL and backoff from the environment
//! - [`error`] -- link and configuration errors

pub mod config;
pub mod error;
pub mod link;

pub use config::{ClientConfig, DEFAULT_RELAY_URL};
pub use error::{ClientConfigError, LinkError};
pub use link::{spawn, spawn_receiver, LinkEvent, LinkHandle};
