//! Ingestion endpoint: validate a producer report, apply it, fan it out.
//!
//! Both the live sensor stream and one-shot manual updates arrive here and
//! take the same path. The apply, snapshot, and publish steps run behind a
//! single writer gate so viewers only ever see snapshots that contain whole
//! updates, in apply order.

use std::fmt;
use std::sync::Arc;

use bustrack_types::{BusLocation, BusLocationReport, BusStatus, Position};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::IngestOrdering;
use crate::error::{IngestError, ValidationError};
use crate::hub::BroadcastHub;
use crate::store::{ApplyOutcome, PositionStore};

/// Where a report entered the relay. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestSource {
    /// A `busLocation` frame on a WebSocket.
    Socket,
    /// `POST /api/locations`.
    Http,
}

impl fmt::Display for IngestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => f.write_str("socket"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Result of an accepted report.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    /// The entry as stored.
    pub location: BusLocation,
    /// Whether the vehicle was new.
    pub outcome: ApplyOutcome,
    /// Store revision of the broadcast snapshot.
    pub revision: u64,
    /// Sessions the snapshot was delivered to.
    pub delivered: usize,
}

/// Turn a raw report into a storable [`BusLocation`].
///
/// Missing `status` defaults to `active`; missing `timestamp` becomes
/// `received_at`.
pub fn validate(
    report: BusLocationReport,
    received_at: DateTime<Utc>,
) -> Result<BusLocation, ValidationError> {
    let bus_id = non_blank(report.bus_id).ok_or(ValidationError::MissingBusId)?;
    let route_id = non_blank(report.route_id).ok_or(ValidationError::MissingRouteId)?;
    let raw = report.position.ok_or(ValidationError::MissingPosition)?;
    let lat = raw.lat.ok_or(ValidationError::MissingCoordinate("lat"))?;
    let lng = raw.lng.ok_or(ValidationError::MissingCoordinate("lng"))?;
    let position = Position::new(lat, lng);
    if let Some((field, value)) = position.invalid_component() {
        return Err(ValidationError::CoordinateOutOfRange { field, value });
    }

    Ok(BusLocation {
        bus_id,
        route_id,
        position,
        status: report.status.unwrap_or(BusStatus::Active),
        timestamp: report.timestamp.unwrap_or(received_at),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The relay's single write path into the store.
#[derive(Debug)]
pub struct Ingestor {
    store: Arc<PositionStore>,
    hub: Arc<BroadcastHub>,
    ordering: IngestOrdering,
    gate: Mutex<()>,
}

impl Ingestor {
    /// Create an ingestor writing to `store` and publishing through `hub`.
    pub fn new(store: Arc<PositionStore>, hub: Arc<BroadcastHub>, ordering: IngestOrdering) -> Self {
        Self {
            store,
            hub,
            ordering,
            gate: Mutex::new(()),
        }
    }

    /// Validate, apply, and broadcast one report.
    ///
    /// Exactly one publish happens per accepted report, even when the values
    /// are identical to what was stored.
    pub async fn ingest(
        &self,
        report: BusLocationReport,
        source: IngestSource,
    ) -> Result<IngestReceipt, IngestError> {
        let location = validate(report, Utc::now()).inspect_err(|e| {
            warn!(%source, error = %e, "Rejected malformed report");
        })?;

        let _gate = self.gate.lock().await;

        let outcome = match self.ordering {
            IngestOrdering::LastWriteWins => self.store.apply(location.clone()).await,
            IngestOrdering::NewestTimestamp => self.store.apply_if_newer(location.clone()).await,
        };
        if let ApplyOutcome::Stale { stored } = outcome {
            warn!(
                %source,
                bus_id = %location.bus_id,
                reported = %location.timestamp,
                %stored,
                "Rejected stale report"
            );
            return Err(IngestError::Stale {
                bus_id: location.bus_id,
                reported: location.timestamp,
                stored,
            });
        }

        let snapshot = Arc::new(self.store.snapshot().await);
        let revision = snapshot.revision;
        let vehicles = snapshot.len();
        let published = self.hub.publish(snapshot).await;

        info!(
            %source,
            bus_id = %location.bus_id,
            route_id = %location.route_id,
            lat = location.position.lat,
            lng = location.position.lng,
            status = %location.status,
            revision,
            vehicles,
            delivered = published.delivered,
            pruned = published.pruned,
            "Position applied"
        );

        Ok(IngestReceipt {
            location,
            outcome,
            revision,
            delivered: published.delivered,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use bustrack_types::ReportedPosition;
    use chrono::TimeDelta;

    use super::*;

    fn report(bus_id: &str, lat: f64, lng: f64) -> BusLocationReport {
        BusLocationReport {
            bus_id: Some(bus_id.to_owned()),
            route_id: Some(String::from("route1")),
            position: Some(ReportedPosition {
                lat: Some(lat),
                lng: Some(lng),
            }),
            status: Some(BusStatus::Active),
            timestamp: Some(Utc::now()),
        }
    }

    fn ingestor(ordering: IngestOrdering) -> Ingestor {
        let store = Arc::new(PositionStore::new());
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&store)));
        Ingestor::new(store, hub, ordering)
    }

    #[test]
    fn validate_fills_defaults() {
        let now = Utc::now();
        let mut r = report("bus101", -6.2, 106.8);
        r.status = None;
        r.timestamp = None;
        let loc = validate(r, now).unwrap();
        assert_eq!(loc.status, BusStatus::Active);
        assert_eq!(loc.timestamp, now);
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let now = Utc::now();

        let mut r = report("bus101", 0.0, 0.0);
        r.bus_id = Some(String::from("  "));
        assert_eq!(validate(r, now), Err(ValidationError::MissingBusId));

        let mut r = report("bus101", 0.0, 0.0);
        r.route_id = None;
        assert_eq!(validate(r, now), Err(ValidationError::MissingRouteId));

        let mut r = report("bus101", 0.0, 0.0);
        r.position = None;
        assert_eq!(validate(r, now), Err(ValidationError::MissingPosition));

        let mut r = report("bus101", 0.0, 0.0);
        r.position = Some(ReportedPosition { lat: Some(1.0), lng: None });
        assert_eq!(validate(r, now), Err(ValidationError::MissingCoordinate("lng")));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let now = Utc::now();
        let err = validate(report("bus101", 91.0, 0.0), now).unwrap_err();
        assert!(matches!(err, ValidationError::CoordinateOutOfRange { field: "lat", .. }));
        let err = validate(report("bus101", 0.0, f64::INFINITY), now).unwrap_err();
        assert!(matches!(err, ValidationError::CoordinateOutOfRange { field: "lng", .. }));
    }

    #[tokio::test]
    async fn unknown_ids_are_stored_as_given() {
        let ing = ingestor(IngestOrdering::LastWriteWins);
        let receipt = ing
            .ingest(report("ghost-bus", -6.2, 106.8), IngestSource::Socket)
            .await
            .unwrap();
        assert_eq!(receipt.outcome, ApplyOutcome::Inserted);
        assert_eq!(receipt.revision, 1);
    }

    #[tokio::test]
    async fn rejected_report_is_not_broadcast() {
        let ing = ingestor(IngestOrdering::LastWriteWins);
        let mut sub = ing.hub.subscribe().await;
        let _ = sub.recv().await;

        let mut bad = report("bus101", 0.0, 0.0);
        bad.position = None;
        assert!(ing.ingest(bad, IngestSource::Socket).await.is_err());
        assert!(sub.try_recv().is_none());
        assert!(ing.store.is_empty().await);
    }

    #[tokio::test]
    async fn newest_timestamp_ordering_rejects_late_sample() {
        let ing = ingestor(IngestOrdering::NewestTimestamp);
        let fresh = report("bus101", -6.2, 106.8);
        let mut late = report("bus101", -6.1, 106.8);
        late.timestamp = Some(Utc::now() - TimeDelta::seconds(60));

        ing.ingest(fresh, IngestSource::Socket).await.unwrap();
        let err = ing.ingest(late, IngestSource::Socket).await.unwrap_err();
        assert!(matches!(err, IngestError::Stale { .. }));
        assert_eq!(ing.store.get("bus101").await.unwrap().position.lat, -6.2);
    }

    #[tokio::test]
    async fn every_accepted_report_publishes() {
        let ing = ingestor(IngestOrdering::LastWriteWins);
        let mut sub = ing.hub.subscribe().await;
        let _ = sub.recv().await;

        let r = report("bus101", -6.2, 106.8);
        ing.ingest(r.clone(), IngestSource::Http).await.unwrap();
        let first = sub.recv().await.unwrap();
        ing.ingest(r, IngestSource::Http).await.unwrap();
        let second = sub.recv().await.unwrap();
        assert!(second.revision > first.revision);
    }
}
