//! Core data structs: positions, vehicle reports, and fleet snapshots.
//!
//! Field names serialize in camelCase so the JSON matches what the map and
//! driver pages already speak (`busId`, `routeId`, `position.lat`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BusStatus;

/// A WGS84 coordinate in floating point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl Position {
    /// Mean Earth radius used for distance estimates, in metres.
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

    /// Construct a position from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.invalid_component().is_none()
    }

    /// The first component that is non-finite or out of range, as
    /// `(name, value)`.
    pub fn invalid_component(&self) -> Option<(&'static str, f64)> {
        if !(self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat)) {
            return Some(("lat", self.lat));
        }
        if !(self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng)) {
            return Some(("lng", self.lng));
        }
        None
    }

    /// Great-circle distance to `other` in metres (haversine).
    pub fn distance_m(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Offset this position by the given deltas in degrees.
    #[must_use]
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        Self {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

/// Latest known state of one vehicle, exactly as broadcast to viewers.
///
/// Wire shape: `{busId, routeId, position: {lat, lng}, status, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BusLocation {
    /// Vehicle identifier; the store key.
    pub bus_id: String,
    /// Route the vehicle is serving.
    pub route_id: String,
    /// Reported coordinates.
    pub position: Position,
    /// Driver-selected status.
    pub status: BusStatus,
    /// Producer-supplied report time (relay receipt time if omitted).
    pub timestamp: DateTime<Utc>,
}

/// A position report as received from a producer, before validation.
///
/// Every field is optional so that malformed reports still parse and can be
/// answered with a precise validation error instead of a generic JSON
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BusLocationReport {
    /// Vehicle identifier.
    pub bus_id: Option<String>,
    /// Route identifier.
    pub route_id: Option<String>,
    /// Reported coordinates.
    pub position: Option<ReportedPosition>,
    /// Driver-selected status; defaults to `active` when omitted.
    pub status: Option<BusStatus>,
    /// Report time; the relay stamps receipt time when omitted.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Coordinates inside a [`BusLocationReport`], each possibly missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReportedPosition {
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lng: Option<f64>,
}

impl From<Position> for ReportedPosition {
    fn from(p: Position) -> Self {
        Self {
            lat: Some(p.lat),
            lng: Some(p.lng),
        }
    }
}

impl From<BusLocation> for BusLocationReport {
    fn from(loc: BusLocation) -> Self {
        Self {
            bus_id: Some(loc.bus_id),
            route_id: Some(loc.route_id),
            position: Some(loc.position.into()),
            status: Some(loc.status),
            timestamp: Some(loc.timestamp),
        }
    }
}

/// Point-in-time copy of every vehicle's latest state.
///
/// `revision` counts store applies since process start; two snapshots with
/// the same revision hold the same data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FleetSnapshot {
    /// Number of applies the store had seen when this copy was taken.
    pub revision: u64,
    /// Vehicles ordered by `bus_id`.
    pub locations: Vec<BusLocation>,
}

impl FleetSnapshot {
    /// Look up one vehicle in the snapshot.
    pub fn get(&self, bus_id: &str) -> Option<&BusLocation> {
        self.locations.iter().find(|loc| loc.bus_id == bus_id)
    }

    /// Number of vehicles in the snapshot.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the snapshot holds no vehicles.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
