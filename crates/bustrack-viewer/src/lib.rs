//! Terminal map viewer for Bustrack.
//!
//! The viewer holds a [`FleetView`](view::FleetView): live entries mirror
//! the relay's latest `busLocations` snapshot exactly, while an optional
//! [`RandomWalk`](simulate::RandomWalk) fills in demo buses that are shown
//! tagged as simulated and never sent anywhere.

pub mod config;
pub mod simulate;
pub mod view;

pub use config::ViewerConfig;
pub use simulate::RandomWalk;
pub use view::{FleetView, Provenance, ViewEntry};
