//! Link behavior against a live relay bound to an ephemeral port.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bustrack_client::{spawn, spawn_receiver, ClientConfig, LinkError, LinkEvent};
use bustrack_relay::{serve, AppState};
use bustrack_types::{BusLocationReport, BusStatus, Position, ReportedPosition};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

async fn spawn_relay_on(listener: TcpListener) -> Arc<AppState> {
    let state = Arc::new(AppState::default());
    let served = Arc::clone(&state);
    tokio::spawn(async move {
        serve(listener, served, std::future::pending()).await.unwrap();
    });
    state
}

async fn spawn_relay() -> (SocketAddr, Arc<AppState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, spawn_relay_on(listener).await)
}

fn fast_config(addr: SocketAddr, path: &str) -> ClientConfig {
    ClientConfig {
        relay_url: format!("ws://{addr}{path}"),
        reconnect_min: Duration::from_millis(50),
        reconnect_max: Duration::from_millis(200),
    }
}

async fn next(events: &mut mpsc::Receiver<LinkEvent>) -> LinkEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
}

fn report(bus_id: Option<&str>) -> BusLocationReport {
    BusLocationReport {
        bus_id: bus_id.map(str::to_owned),
        route_id: Some(String::from("route1")),
        position: Some(ReportedPosition::from(Position::new(-6.208, 106.847))),
        status: Some(BusStatus::Active),
        timestamp: Some(chrono::Utc::now()),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn connects_hydrates_and_reports() {
    let (addr, state) = spawn_relay().await;
    let (link, mut events) = spawn(fast_config(addr, "/ws"));

    assert_eq!(next(&mut events).await, LinkEvent::Connected);
    assert_eq!(next(&mut events).await, LinkEvent::Snapshot(Vec::new()));
    assert!(link.is_connected());

    link.send(report(Some("bus101"))).unwrap();
    match next(&mut events).await {
        LinkEvent::Snapshot(list) => {
            assert_eq!(list.len(), 1);
            assert_eq!(list.first().unwrap().bus_id, "bus101");
        }
        other => panic!("expected a snapshot, got {other:?}"),
    }
    assert_eq!(state.relay.store.len().await, 1);
}

#[tokio::test]
async fn rejected_report_comes_back_as_event() {
    let (addr, _state) = spawn_relay().await;
    let (link, mut events) = spawn(fast_config(addr, "/ws/ingest"));
    assert_eq!(next(&mut events).await, LinkEvent::Connected);

    link.send(report(None)).unwrap();
    match next(&mut events).await {
        LinkEvent::Rejected(message) => assert!(message.contains("busId")),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn receive_only_link_refuses_to_send() {
    let (addr, _state) = spawn_relay().await;
    let (link, mut events) = spawn_receiver(fast_config(addr, "/ws"));
    assert_eq!(next(&mut events).await, LinkEvent::Connected);
    assert!(matches!(
        link.send(report(Some("bus101"))),
        Err(LinkError::ReceiveOnly)
    ));
}

#[tokio::test]
async fn send_without_connection_fails_fast() {
    // Reserve a port, then free it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (link, _events) = spawn(fast_config(addr, "/ws"));
    assert!(!link.is_connected());
    assert!(matches!(
        link.send(report(Some("bus101"))),
        Err(LinkError::NotConnected)
    ));
}

#[tokio::test]
async fn keeps_retrying_until_relay_appears() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_link, mut events) = spawn(fast_config(addr, "/ws"));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let listener = TcpListener::bind(addr).await.unwrap();
    let _state = spawn_relay_on(listener).await;

    assert_eq!(next(&mut events).await, LinkEvent::Connected);
    assert_eq!(next(&mut events).await, LinkEvent::Snapshot(Vec::new()));
}

#[tokio::test]
async fn dropping_events_stops_the_task() {
    let (addr, state) = spawn_relay().await;
    let (link, mut events) = spawn(fast_config(addr, "/ws"));
    assert_eq!(next(&mut events).await, LinkEvent::Connected);
    drop(events);

    for _ in 0..100 {
        if link.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(link.is_finished());

    for _ in 0..100 {
        if state.relay.hub.session_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.relay.hub.session_count().await, 0);
}
