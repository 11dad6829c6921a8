//! End-to-end properties of the store, hub, and ingestor working together.
//!
//! These run against [`Relay`] directly, without any transport, so they pin
//! down the synchronization semantics independently of the WebSocket layer.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::sync::Arc;

use bustrack_core::{IngestOrdering, IngestSource, Relay};
use bustrack_types::{BusLocationReport, BusStatus, Position, ReportedPosition};
use chrono::Utc;

fn report(bus_id: &str, route_id: &str, lat: f64, lng: f64) -> BusLocationReport {
    BusLocationReport {
        bus_id: Some(bus_id.to_owned()),
        route_id: Some(route_id.to_owned()),
        position: Some(ReportedPosition::from(Position::new(lat, lng))),
        status: Some(BusStatus::Active),
        timestamp: Some(Utc::now()),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn viewer_connected_before_update_sees_exact_coordinates() {
    let relay = Relay::default();
    let mut viewer = relay.hub.subscribe().await;
    assert!(viewer.recv().await.unwrap().is_empty());

    relay
        .ingestor
        .ingest(report("bus101", "route1", -6.208, 106.847), IngestSource::Socket)
        .await
        .unwrap();

    let snap = viewer.recv().await.unwrap();
    let bus = snap.get("bus101").unwrap();
    assert_eq!(bus.position, Position::new(-6.208, 106.847));
    assert_eq!(bus.route_id, "route1");
    assert_eq!(bus.status, BusStatus::Active);
}

#[tokio::test]
async fn late_viewer_is_hydrated_with_every_vehicle() {
    let relay = Relay::default();
    let ids = ["bus101", "bus102", "bus201", "bus202", "bus301"];
    for (i, id) in ids.iter().enumerate() {
        let lat = -6.2 - f64::from(u32::try_from(i).unwrap()) * 0.001;
        relay
            .ingestor
            .ingest(report(id, "route1", lat, 106.84), IngestSource::Socket)
            .await
            .unwrap();
    }
    // Second round overwrites the first one for bus101 only.
    relay
        .ingestor
        .ingest(report("bus101", "route1", -6.3, 106.9), IngestSource::Socket)
        .await
        .unwrap();

    let mut viewer = relay.hub.subscribe().await;
    let snap = viewer.recv().await.unwrap();
    assert_eq!(snap.len(), ids.len());
    for id in ids {
        assert_eq!(snap.locations.iter().filter(|l| l.bus_id == id).count(), 1);
    }
    assert_eq!(snap.get("bus101").unwrap().position, Position::new(-6.3, 106.9));
}

#[tokio::test]
async fn every_subscriber_gets_the_full_set() {
    let relay = Relay::default();
    relay
        .ingestor
        .ingest(report("bus101", "route1", -6.208, 106.847), IngestSource::Socket)
        .await
        .unwrap();

    let mut viewers = Vec::new();
    for _ in 0..4 {
        let mut v = relay.hub.subscribe().await;
        let _ = v.recv().await;
        viewers.push(v);
    }

    relay
        .ingestor
        .ingest(report("bus201", "route2", -6.211, 106.838), IngestSource::Socket)
        .await
        .unwrap();

    for v in &mut viewers {
        let snap = v.recv().await.unwrap();
        assert_eq!(snap.len(), 2, "a publish must carry the whole store, not a delta");
    }
}

#[tokio::test]
async fn dead_subscriber_does_not_block_others() {
    let relay = Relay::default();
    let mut alive = relay.hub.subscribe().await;
    let _ = alive.recv().await;
    let dead = relay.hub.subscribe().await;
    drop(dead);
    // A subscriber that never reads.
    let _stalled = relay.hub.subscribe().await;

    let receipt = relay
        .ingestor
        .ingest(report("bus101", "route1", -6.208, 106.847), IngestSource::Socket)
        .await
        .unwrap();
    assert_eq!(receipt.delivered, 2);

    let snap = alive.recv().await.unwrap();
    assert!(snap.get("bus101").is_some());
    assert_eq!(relay.hub.session_count().await, 2);
}

#[tokio::test]
async fn double_unsubscribe_is_harmless() {
    let relay = Relay::default();
    let viewer = relay.hub.subscribe().await;
    let id = viewer.id();
    assert!(relay.hub.unsubscribe(id).await);
    assert!(!relay.hub.unsubscribe(id).await);
}

#[tokio::test]
async fn empty_relay_hydrates_with_empty_snapshot() {
    let relay = Relay::default();
    let mut viewer = relay.hub.subscribe().await;
    let snap = viewer.recv().await.unwrap();
    assert!(snap.is_empty());
    assert_eq!(snap.revision, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_end_with_one_entry_each() {
    let relay = Relay::default();
    let mut viewer = relay.hub.subscribe().await;
    let _ = viewer.recv().await;

    let mut tasks = Vec::new();
    for (bus, route, lat, lng) in [
        ("bus101", "route1", -6.208, 106.847),
        ("bus201", "route2", -6.211, 106.838),
    ] {
        let ingestor = Arc::clone(&relay.ingestor);
        tasks.push(tokio::spawn(async move {
            for step in 0..50_u32 {
                let dl = f64::from(step) * 0.0001;
                ingestor
                    .ingest(report(bus, route, lat + dl, lng), IngestSource::Socket)
                    .await
                    .unwrap();
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let snap = relay.store.snapshot().await;
    assert_eq!(snap.len(), 2);
    assert_eq!(snap.revision, 100);
    let last = f64::from(49_u32) * 0.0001;
    assert_eq!(snap.get("bus101").unwrap().position.lat, -6.208 + last);
    assert_eq!(snap.get("bus201").unwrap().position.lat, -6.211 + last);

    // The viewer converges on the final state.
    let mut latest = viewer.recv().await.unwrap();
    while let Some(next) = viewer.try_recv() {
        latest = next;
    }
    assert_eq!(latest.revision, 100);
    assert_eq!(latest.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_seen_by_viewers_only_move_forward() {
    let relay = Relay::default();
    let mut viewer = relay.hub.subscribe().await;
    let first = viewer.recv().await.unwrap();

    let ingestor = Arc::clone(&relay.ingestor);
    let producer = tokio::spawn(async move {
        for step in 0..200_u32 {
            let id = format!("bus{}", step % 7);
            ingestor
                .ingest(report(&id, "route1", -6.2, 106.8), IngestSource::Socket)
                .await
                .unwrap();
        }
    });

    let mut last_revision = first.revision;
    loop {
        let snap = viewer.recv().await.unwrap();
        assert!(snap.revision > last_revision);
        // A whole number of applies is reflected: entry count matches the
        // ids seen so far.
        let expected = usize::try_from(snap.revision.min(7)).unwrap();
        assert_eq!(snap.len(), expected);
        last_revision = snap.revision;
        if snap.revision == 200 {
            break;
        }
    }
    producer.await.unwrap();
}

#[tokio::test]
async fn newest_timestamp_policy_is_opt_in() {
    let lww = Relay::new(IngestOrdering::LastWriteWins);
    let newest = Relay::new(IngestOrdering::NewestTimestamp);

    let fresh = report("bus101", "route1", -6.2, 106.8);
    let mut late = report("bus101", "route1", -6.1, 106.8);
    late.timestamp = Some(Utc::now() - chrono::TimeDelta::minutes(5));

    for relay in [&lww, &newest] {
        relay
            .ingestor
            .ingest(fresh.clone(), IngestSource::Socket)
            .await
            .unwrap();
    }
    assert!(lww.ingestor.ingest(late.clone(), IngestSource::Socket).await.is_ok());
    assert!(newest.ingestor.ingest(late, IngestSource::Socket).await.is_err());

    assert_eq!(lww.store.get("bus101").await.unwrap().position.lat, -6.1);
    assert_eq!(newest.store.get("bus101").await.unwrap().position.lat, -6.2);
}
