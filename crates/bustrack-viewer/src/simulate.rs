//! Demo movement for catalog buses when no driver is reporting.
//!
//! Every catalog bus starts within [`SEED_JITTER_DEG`] of its catalog
//! position and then drifts by up to [`STEP_DEG`] per tick on each axis.
//! Output is only ever fed into
//! [`FleetView::set_simulated`](crate::view::FleetView::set_simulated).

use std::time::Duration;

use bustrack_types::{BusLocation, BusStatus, Catalog};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maximum initial offset from the catalog position, in degrees.
pub const SEED_JITTER_DEG: f64 = 0.005;

/// Maximum per-tick drift, in degrees.
pub const STEP_DEG: f64 = 0.0005;

/// Default time between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// Random-walk simulator over the catalog fleet.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    rng: StdRng,
    buses: Vec<BusLocation>,
}

impl RandomWalk {
    /// Seed from the operating system's entropy.
    pub fn new(catalog: &Catalog) -> Self {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }

    /// Deterministic simulator for tests.
    pub fn seeded(catalog: &Catalog, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: &Catalog, mut rng: StdRng) -> Self {
        let now = Utc::now();
        let buses = catalog
            .buses()
            .map(|(route, bus)| BusLocation {
                bus_id: bus.id.clone(),
                route_id: route.id.clone(),
                position: bus.current_position.offset(
                    rng.random_range(-SEED_JITTER_DEG..=SEED_JITTER_DEG),
                    rng.random_range(-SEED_JITTER_DEG..=SEED_JITTER_DEG),
                ),
                status: BusStatus::Active,
                timestamp: now,
            })
            .collect();
        Self { rng, buses }
    }

    /// Move every bus one step.
    pub fn step(&mut self) -> &[BusLocation] {
        let now = Utc::now();
        for bus in &mut self.buses {
            bus.position = bus.position.offset(
                self.rng.random_range(-STEP_DEG..=STEP_DEG),
                self.rng.random_range(-STEP_DEG..=STEP_DEG),
            );
            bus.timestamp = now;
        }
        &self.buses
    }

    /// Current simulated positions.
    pub fn locations(&self) -> &[BusLocation] {
        &self.buses
    }
}
