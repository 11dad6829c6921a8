//! In-memory store of the latest known position per vehicle.
//!
//! The store is keyed by `bus_id` and keeps no history: each apply fully
//! replaces the previous entry for that id. Readers get an owned
//! [`FleetSnapshot`], never a reference into the map, so a fan-out that is
//! still serializing one snapshot cannot observe a later write.

use std::collections::BTreeMap;

use bustrack_types::{BusLocation, FleetSnapshot};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// What an apply did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First report for this vehicle.
    Inserted,
    /// An existing entry was overwritten.
    Replaced,
    /// Rejected because the stored report is newer (only from
    /// [`PositionStore::apply_if_newer`]).
    Stale {
        /// Timestamp of the entry that was kept.
        stored: DateTime<Utc>,
    },
}

impl ApplyOutcome {
    /// Whether the store was mutated.
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    locations: BTreeMap<String, BusLocation>,
    revision: u64,
}

impl StoreInner {
    fn write(&mut self, update: BusLocation) -> ApplyOutcome {
        self.revision = self.revision.saturating_add(1);
        match self.locations.insert(update.bus_id.clone(), update) {
            Some(_) => ApplyOutcome::Replaced,
            None => ApplyOutcome::Inserted,
        }
    }
}

/// Latest-write-wins map from vehicle id to its last reported state.
#[derive(Debug, Default)]
pub struct PositionStore {
    inner: RwLock<StoreInner>,
}

impl PositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `update`, replacing any previous entry for the same vehicle.
    ///
    /// Never fails. Unknown vehicle or route ids are stored as given.
    pub async fn apply(&self, update: BusLocation) -> ApplyOutcome {
        self.inner.write().await.write(update)
    }

    /// Store `update` unless the stored entry carries a later timestamp.
    ///
    /// Equal timestamps are applied, so a producer resending the same fix
    /// still produces a broadcast.
    pub async fn apply_if_newer(&self, update: BusLocation) -> ApplyOutcome {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .locations
            .get(&update.bus_id)
            .filter(|existing| existing.timestamp > update.timestamp)
        {
            return ApplyOutcome::Stale {
                stored: existing.timestamp,
            };
        }
        inner.write(update)
    }

    /// Take a consistent point-in-time copy of every vehicle.
    pub async fn snapshot(&self) -> FleetSnapshot {
        let inner = self.inner.read().await;
        FleetSnapshot {
            revision: inner.revision,
            locations: inner.locations.values().cloned().collect(),
        }
    }

    /// Latest state of one vehicle.
    pub async fn get(&self, bus_id: &str) -> Option<BusLocation> {
        self.inner.read().await.locations.get(bus_id).cloned()
    }

    /// Number of tracked vehicles.
    pub async fn len(&self) -> usize {
        self.inner.read().await.locations.len()
    }

    /// Whether no vehicle has reported yet.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.locations.is_empty()
    }

    /// Number of successful applies since the store was created.
    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use bustrack_types::{BusStatus, Position};
    use chrono::TimeDelta;

    use super::*;

    fn report(bus_id: &str, lat: f64, at: DateTime<Utc>) -> BusLocation {
        BusLocation {
            bus_id: bus_id.to_owned(),
            route_id: String::from("route1"),
            position: Position::new(lat, 106.847),
            status: BusStatus::Active,
            timestamp: at,
        }
    }

    #[tokio::test]
    async fn empty_store_snapshot() {
        let store = PositionStore::new();
        let snap = store.snapshot().await;
        assert!(snap.is_empty());
        assert_eq!(snap.revision, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn latest_write_wins() {
        let store = PositionStore::new();
        let now = Utc::now();
        assert_eq!(store.apply(report("bus101", -6.1, now)).await, ApplyOutcome::Inserted);
        assert_eq!(store.apply(report("bus101", -6.2, now)).await, ApplyOutcome::Replaced);
        assert_eq!(store.apply(report("bus101", -6.3, now)).await, ApplyOutcome::Replaced);

        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("bus101").unwrap().position.lat, -6.3);
        assert_eq!(snap.revision, 3);
    }

    #[tokio::test]
    async fn identical_update_still_counts() {
        let store = PositionStore::new();
        let loc = report("bus101", -6.2, Utc::now());
        store.apply(loc.clone()).await;
        store.apply(loc).await;
        assert_eq!(store.revision().await, 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn late_sample_overrides_under_plain_apply() {
        let store = PositionStore::new();
        let now = Utc::now();
        store.apply(report("bus101", -6.2, now)).await;
        store
            .apply(report("bus101", -6.1, now - TimeDelta::seconds(30)))
            .await;
        assert_eq!(store.get("bus101").await.unwrap().position.lat, -6.1);
    }

    #[tokio::test]
    async fn apply_if_newer_rejects_older_sample() {
        let store = PositionStore::new();
        let now = Utc::now();
        store.apply_if_newer(report("bus101", -6.2, now)).await;
        let outcome = store
            .apply_if_newer(report("bus101", -6.1, now - TimeDelta::seconds(30)))
            .await;
        assert_eq!(outcome, ApplyOutcome::Stale { stored: now });
        assert!(!outcome.is_applied());
        assert_eq!(store.get("bus101").await.unwrap().position.lat, -6.2);
        assert_eq!(store.revision().await, 1);
    }

    #[tokio::test]
    async fn snapshot_is_detached_copy() {
        let store = PositionStore::new();
        store.apply(report("bus101", -6.2, Utc::now())).await;
        let before = store.snapshot().await;
        store.apply(report("bus201", -6.21, Utc::now())).await;
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_bus_id() {
        let store = PositionStore::new();
        let now = Utc::now();
        store.apply(report("bus301", -6.2, now)).await;
        store.apply(report("bus101", -6.2, now)).await;
        store.apply(report("bus201", -6.2, now)).await;
        let ids: Vec<_> = store
            .snapshot()
            .await
            .locations
            .into_iter()
            .map(|l| l.bus_id)
            .collect();
        assert_eq!(ids, ["bus101", "bus201", "bus301"]);
    }
}
