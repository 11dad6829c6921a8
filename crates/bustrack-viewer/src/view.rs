//! The viewer's local picture of the fleet.
//!
//! Live entries come only from relay snapshots and are replaced wholesale on
//! every snapshot. Simulated entries are kept in a separate map and never
//! mix with live data: a live entry hides the simulated entry for the same
//! bus.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use bustrack_types::{BusLocation, Catalog};

/// Where a rendered entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Reported by a driver through the relay.
    Live,
    /// Generated locally for the demo.
    Simulated,
}

impl Provenance {
    /// Short label for tables.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Simulated => "sim",
        }
    }
}

/// One vehicle as the viewer shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    /// The location itself.
    pub location: BusLocation,
    /// Live or simulated.
    pub provenance: Provenance,
    /// Catalog route name, or the raw route id.
    pub route_name: String,
    /// Catalog bus name, or the raw bus id.
    pub bus_name: String,
}

/// Live and simulated positions keyed by bus id.
#[derive(Debug, Clone)]
pub struct FleetView {
    catalog: Arc<Catalog>,
    live: BTreeMap<String, BusLocation>,
    simulated: BTreeMap<String, BusLocation>,
}

impl FleetView {
    /// Empty view labelled from `catalog`.
    pub const fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            live: BTreeMap::new(),
            simulated: BTreeMap::new(),
        }
    }

    /// Replace all live entries with `snapshot`.
    pub fn apply_snapshot(&mut self, snapshot: Vec<BusLocation>) {
        self.live = snapshot
            .into_iter()
            .map(|loc| (loc.bus_id.clone(), loc))
            .collect();
    }

    /// Replace all simulated entries.
    pub fn set_simulated<'a>(&mut self, locations: impl IntoIterator<Item = &'a BusLocation>) {
        self.simulated = locations
            .into_iter()
            .map(|loc| (loc.bus_id.clone(), loc.clone()))
            .collect();
    }

    /// Drop all simulated entries.
    pub fn clear_simulated(&mut self) {
        self.simulated.clear();
    }

    /// Number of live entries.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of simulated entries, hidden or not.
    pub fn simulated_count(&self) -> usize {
        self.simulated.len()
    }

    /// Entries to show, ordered by bus id, optionally for one route only.
    pub fn entries(&self, route_filter: Option<&str>) -> Vec<ViewEntry> {
        let live = self.live.values().map(|loc| (loc, Provenance::Live));
        let simulated = self
            .simulated
            .values()
            .filter(|loc| !self.live.contains_key(&loc.bus_id))
            .map(|loc| (loc, Provenance::Simulated));

        let mut entries: Vec<ViewEntry> = live
            .chain(simulated)
            .filter(|(loc, _)| route_filter.is_none_or(|route| loc.route_id == route))
            .map(|(loc, provenance)| self.label(loc, provenance))
            .collect();
        entries.sort_by(|a, b| a.location.bus_id.cmp(&b.location.bus_id));
        entries
    }

    fn label(&self, location: &BusLocation, provenance: Provenance) -> ViewEntry {
        let route_name = self
            .catalog
            .route(&location.route_id)
            .map_or_else(|| location.route_id.clone(), |route| route.name.clone());
        let bus_name = self
            .catalog
            .bus(&location.bus_id)
            .map_or_else(|| location.bus_id.clone(), |(_, bus)| bus.name.clone());
        ViewEntry {
            location: location.clone(),
            provenance,
            route_name,
            bus_name,
        }
    }

    /// Plain-text table of [`entries`](Self::entries).
    pub fn render(&self, route_filter: Option<&str>) -> String {
        let entries = self.entries(route_filter);
        let mut out = format!(
            "{} vehicles ({} live, {} simulated)\n",
            entries.len(),
            entries.iter().filter(|e| e.provenance == Provenance::Live).count(),
            entries.iter().filter(|e| e.provenance == Provenance::Simulated).count(),
        );
        for entry in &entries {
            let loc = &entry.location;
            let _ = writeln!(
                out,
                "{:<5} {:<10} {:<28} {:>11.6} {:>11.6}  {:<11} {}",
                entry.provenance.as_str(),
                entry.bus_name,
                entry.route_name,
                loc.position.lat,
                loc.position.lng,
                loc.status.as_str(),
                loc.timestamp.format("%H:%M:%S"),
            );
        }
        out
    }
}
