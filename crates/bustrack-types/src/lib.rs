//! Shared type definitions for Bustrack.
//!
//! This crate is the single source of truth for the data that crosses the
//! wire between driver devices, the relay, and map viewers. Types flow to
//! `TypeScript` via `ts-rs` for the browser clients.
//!
//! # Modules
//!
//! - [`ids`] -- UUID wrappers for relay-generated handles
//! - [`enums`] -- Vehicle status
//! - [`structs`] -- Positions, vehicle reports, fleet snapshots
//! - [`protocol`] -- WebSocket frame envelopes
//! - [`catalog`] -- Static route/stop/bus reference data

pub mod catalog;
pub mod enums;
pub mod ids;
pub mod protocol;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use catalog::{BusRoute, Catalog, CatalogBus, Stop};
pub use enums::{BusStatus, UnknownStatus};
pub use ids::SessionId;
pub use protocol::{ClientEvent, ServerEvent};
pub use structs::{BusLocation, BusLocationReport, FleetSnapshot, Position, ReportedPosition};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the browser clients.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::SessionId::export_all();
        let _ = crate::enums::BusStatus::export_all();
        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::BusLocation::export_all();
        let _ = crate::structs::BusLocationReport::export_all();
        let _ = crate::structs::FleetSnapshot::export_all();
        let _ = crate::protocol::ClientEvent::export_all();
        let _ = crate::protocol::ServerEvent::export_all();
        let _ = crate::catalog::Catalog::export_all();
    }
}
