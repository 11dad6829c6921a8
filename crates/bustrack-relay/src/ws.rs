//! `WebSocket` handlers for viewers and producers.
//!
//! Two endpoints share one frame handler:
//!
//! - `GET /ws` -- full participant. The session is hydrated with the whole
//!   fleet on connect, receives every later snapshot, and may also send
//!   `busLocation` reports.
//! - `GET /ws/ingest` -- producer only. Reports are accepted but no
//!   snapshots are pushed back.
//!
//! A rejected report is answered with an `error` frame on the offending
//! socket only. Accepted reports reach every participant, the sender
//! included, through the hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use bustrack_core::{IngestSource, Subscription};
use bustrack_types::{ClientEvent, FleetSnapshot, ServerEvent, SessionId};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade to a participant socket that is hydrated and subscribed.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_participant(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_participant(socket, state))
}

/// Upgrade to a producer-only socket.
///
/// # Route
///
/// `GET /ws/ingest`
pub async fn ws_ingest(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_producer(socket, state))
}

/// Subscribe, run the session, and always unsubscribe afterwards.
async fn handle_participant(mut socket: WebSocket, state: Arc<AppState>) {
    let subscription = state.relay.hub.subscribe().await;
    let id = subscription.id();
    info!(session = %id, role = "participant", "Client connected");

    run_participant(&mut socket, &state, subscription).await;

    state.relay.hub.unsubscribe(id).await;
    info!(session = %id, role = "participant", "Client disconnected");
}

async fn run_participant(socket: &mut WebSocket, state: &AppState, mut subscription: Subscription) {
    let id = subscription.id();
    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    debug!(session = %id, "Subscription closed");
                    return;
                };
                let Some(frame) = snapshot_frame(&snapshot) else {
                    continue;
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    debug!(session = %id, "Send failed");
                    return;
                }
            }
            msg = socket.recv() => {
                if !handle_inbound(socket, state, id, msg).await {
                    return;
                }
            }
        }
    }
}

async fn handle_producer(mut socket: WebSocket, state: Arc<AppState>) {
    let id = SessionId::new();
    info!(session = %id, role = "producer", "Client connected");

    loop {
        let msg = socket.recv().await;
        if !handle_inbound(&mut socket, &state, id, msg).await {
            break;
        }
    }

    info!(session = %id, role = "producer", "Client disconnected");
}

/// Process one inbound socket item. Returns `false` when the session ends.
async fn handle_inbound(
    socket: &mut WebSocket,
    state: &AppState,
    id: SessionId,
    msg: Option<Result<Message, axum::Error>>,
) -> bool {
    match msg {
        Some(Ok(Message::Close(_))) | None => false,
        Some(Ok(Message::Ping(data))) => socket.send(Message::Pong(data)).await.is_ok(),
        Some(Ok(Message::Text(text))) => {
            let Some(reply) = handle_text(state, id, text.as_str()).await else {
                return true;
            };
            socket.send(Message::Text(reply.into())).await.is_ok()
        }
        Some(Err(e)) => {
            debug!(session = %id, "WebSocket error: {e}");
            false
        }
        Some(Ok(_)) => true,
    }
}

/// Decode and ingest a text frame, returning an `error` frame on rejection.
async fn handle_text(state: &AppState, id: SessionId, text: &str) -> Option<String> {
    let message = match ClientEvent::from_frame(text) {
        Ok(ClientEvent::BusLocation(report)) => {
            match state.relay.ingestor.ingest(report, IngestSource::Socket).await {
                Ok(receipt) => {
                    debug!(
                        session = %id,
                        bus_id = %receipt.location.bus_id,
                        revision = receipt.revision,
                        "Report accepted",
                    );
                    return None;
                }
                Err(e) => e.to_string(),
            }
        }
        Err(e) => {
            warn!(session = %id, error = %e, "Malformed frame");
            format!("malformed frame: {e}")
        }
    };

    match (ServerEvent::Error { message }).to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Failed to serialize error frame: {e}");
            None
        }
    }
}

fn snapshot_frame(snapshot: &FleetSnapshot) -> Option<String> {
    match ServerEvent::BusLocations(snapshot.locations.clone()).to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(revision = snapshot.revision, "Failed to serialize snapshot: {e}");
            None
        }
    }
}
