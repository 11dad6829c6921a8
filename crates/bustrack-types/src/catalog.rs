//! Static route, stop, and bus reference data.
//!
//! The catalog is read-only configuration. Clients use it to populate
//! selection lists and human-readable labels; the relay serves it over
//! REST. Nothing in the synchronization path validates against it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::Position;

/// A bus stop along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stop {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Stop coordinates, flattened into `lat`/`lng` on the wire.
    #[serde(flatten)]
    pub position: Position,
}

/// A vehicle assigned to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CatalogBus {
    /// Vehicle identifier, as used in position reports.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Seated plus standing capacity.
    pub capacity: u32,
    /// Nominal position used before any live report exists.
    pub current_position: Position,
}

/// A route with its path polyline, stops, and assigned buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BusRoute {
    /// Route identifier, as used in position reports.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Map color as a CSS hex string.
    pub color: String,
    /// Ordered polyline the buses follow.
    pub path: Vec<Position>,
    /// Ordered stops.
    pub stops: Vec<Stop>,
    /// Buses assigned to this route.
    pub buses: Vec<CatalogBus>,
}

/// The full reference catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Catalog {
    /// All routes in display order.
    pub routes: Vec<BusRoute>,
}

impl Catalog {
    /// Find a route by identifier.
    pub fn route(&self, route_id: &str) -> Option<&BusRoute> {
        self.routes.iter().find(|r| r.id == route_id)
    }

    /// Find a bus and the route it belongs to.
    pub fn bus(&self, bus_id: &str) -> Option<(&BusRoute, &CatalogBus)> {
        self.buses().find(|(_, bus)| bus.id == bus_id)
    }

    /// Iterate every bus together with its route.
    pub fn buses(&self) -> impl Iterator<Item = (&BusRoute, &CatalogBus)> {
        self.routes
            .iter()
            .flat_map(|route| route.buses.iter().map(move |bus| (route, bus)))
    }

    /// The three Jakarta demo routes the service shipped with.
    #[allow(clippy::too_many_lines)]
    pub fn demo() -> Self {
        Self {
            routes: vec![
                BusRoute {
                    id: String::from("route1"),
                    name: String::from("Rute A - Terminal Pusat ke Terminal Timur"),
                    description: String::from(
                        "Rute dari Terminal Pusat menuju Terminal Timur melalui pusat kota",
                    ),
                    color: String::from("#4CAF50"),
                    path: polyline(&[
                        (-6.2088, 106.8456),
                        (-6.208, 106.847),
                        (-6.207, 106.849),
                        (-6.206, 106.851),
                        (-6.205, 106.853),
                        (-6.204, 106.855),
                        (-6.203, 106.857),
                        (-6.202, 106.859),
                    ]),
                    stops: vec![
                        stop("Terminal Pusat", "Jl. Terminal Pusat No. 1", -6.2088, 106.8456),
                        stop("Halte Thamrin", "Jl. MH Thamrin No. 10", -6.207, 106.849),
                        stop("Halte Sudirman", "Jl. Jenderal Sudirman No. 25", -6.205, 106.853),
                        stop("Terminal Timur", "Jl. Terminal Timur No. 1", -6.202, 106.859),
                    ],
                    buses: vec![
                        bus("bus101", "Bus A-101", 40, -6.208, 106.847),
                        bus("bus102", "Bus A-102", 40, -6.205, 106.853),
                    ],
                },
                BusRoute {
                    id: String::from("route2"),
                    name: String::from("Rute B - Terminal Barat ke Terminal Selatan"),
                    description: String::from(
                        "Rute dari Terminal Barat menuju Terminal Selatan melalui area bisnis",
                    ),
                    color: String::from("#2196F3"),
                    path: polyline(&[
                        (-6.21, 106.84),
                        (-6.211, 106.838),
                        (-6.212, 106.836),
                        (-6.213, 106.834),
                        (-6.214, 106.832),
                        (-6.215, 106.83),
                        (-6.216, 106.828),
                        (-6.217, 106.826),
                    ]),
                    stops: vec![
                        stop("Terminal Barat", "Jl. Terminal Barat No. 1", -6.21, 106.84),
                        stop("Halte Gajah Mada", "Jl. Gajah Mada No. 15", -6.212, 106.836),
                        stop("Halte Hayam Wuruk", "Jl. Hayam Wuruk No. 30", -6.215, 106.83),
                        stop("Terminal Selatan", "Jl. Terminal Selatan No. 1", -6.217, 106.826),
                    ],
                    buses: vec![
                        bus("bus201", "Bus B-201", 35, -6.211, 106.838),
                        bus("bus202", "Bus B-202", 35, -6.215, 106.83),
                    ],
                },
                BusRoute {
                    id: String::from("route3"),
                    name: String::from("Rute C - Terminal Utara ke Terminal Pusat"),
                    description: String::from(
                        "Rute dari Terminal Utara menuju Terminal Pusat melalui kawasan perumahan",
                    ),
                    color: String::from("#FF9800"),
                    path: polyline(&[
                        (-6.2, 106.85),
                        (-6.201, 106.849),
                        (-6.202, 106.848),
                        (-6.203, 106.847),
                        (-6.204, 106.846),
                        (-6.205, 106.845),
                        (-6.206, 106.844),
                        (-6.207, 106.843),
                        (-6.208, 106.842),
                        (-6.2088, 106.8456),
                    ]),
                    stops: vec![
                        stop("Terminal Utara", "Jl. Terminal Utara No. 1", -6.2, 106.85),
                        stop("Halte Kemayoran", "Jl. Kemayoran No. 20", -6.203, 106.847),
                        stop("Halte Gunung Sahari", "Jl. Gunung Sahari No. 35", -6.206, 106.844),
                        stop("Terminal Pusat", "Jl. Terminal Pusat No. 1", -6.2088, 106.8456),
                    ],
                    buses: vec![
                        bus("bus301", "Bus C-301", 30, -6.201, 106.849),
                        bus("bus302", "Bus C-302", 30, -6.205, 106.845),
                    ],
                },
            ],
        }
    }
}

fn polyline(points: &[(f64, f64)]) -> Vec<Position> {
    points.iter().map(|&(lat, lng)| Position::new(lat, lng)).collect()
}

fn stop(name: &str, address: &str, lat: f64, lng: f64) -> Stop {
    Stop {
        name: name.to_owned(),
        address: address.to_owned(),
        position: Position::new(lat, lng),
    }
}

fn bus(id: &str, name: &str, capacity: u32, lat: f64, lng: f64) -> CatalogBus {
    CatalogBus {
        id: id.to_owned(),
        name: name.to_owned(),
        capacity,
        current_position: Position::new(lat, lng),
    }
}
