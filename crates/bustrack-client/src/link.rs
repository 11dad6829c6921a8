//! Reconnecting `WebSocket` link to the relay.
//!
//! [`spawn`] starts one background task that owns the socket. The task
//! reconnects with doubling backoff, pushes [`LinkEvent`]s to the returned
//! receiver, and writes queued reports. Every fresh connection is followed
//! by a full `busLocations` snapshot from the relay, so nothing needs to be
//! replayed after an outage.
//!
//! Reports are fire-and-forget: [`LinkHandle::send`] never waits, and a
//! report queued just before a disconnect is discarded rather than sent
//! late.
//!
//! The task stops when the event receiver is dropped or the handle is
//! dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bustrack_types::{BusLocation, BusLocationReport, ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::LinkError;

const OUTBOUND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 64;

/// Something that happened on the link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A connection to the relay was established.
    Connected,
    /// The connection was lost; a reconnect is scheduled.
    Disconnected,
    /// The relay sent the complete current fleet.
    Snapshot(Vec<BusLocation>),
    /// The relay rejected a report sent on this link.
    Rejected(String),
}

/// Owner of a running link task.
#[derive(Debug)]
pub struct LinkHandle {
    outbound: Option<mpsc::Sender<String>>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl LinkHandle {
    /// Whether a relay connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue a report for the relay without waiting.
    ///
    /// # Errors
    ///
    /// Fails if the link is receive-only, not connected, its queue is full,
    /// or its task has stopped.
    pub fn send(&self, report: BusLocationReport) -> Result<(), LinkError> {
        let Some(tx) = &self.outbound else {
            return Err(LinkError::ReceiveOnly);
        };
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        let frame = ClientEvent::BusLocation(report).to_frame()?;
        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => LinkError::Backpressure,
            TrySendError::Closed(_) => LinkError::Closed,
        })
    }

    /// Whether the link task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a link that both reports and receives snapshots.
pub fn spawn(config: ClientConfig) -> (LinkHandle, mpsc::Receiver<LinkEvent>) {
    spawn_link(config, true)
}

/// Start a link that only receives; [`LinkHandle::send`] always fails.
pub fn spawn_receiver(config: ClientConfig) -> (LinkHandle, mpsc::Receiver<LinkEvent>) {
    spawn_link(config, false)
}

fn spawn_link(config: ClientConfig, with_outbound: bool) -> (LinkHandle, mpsc::Receiver<LinkEvent>) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
    let (outbound, outbound_rx) = if with_outbound {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let connected = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn(run_link(
        config,
        outbound_rx,
        events_tx,
        Arc::clone(&connected),
    ));
    (
        LinkHandle {
            outbound,
            connected,
            task,
        },
        events_rx,
    )
}

enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

async fn run_link(
    config: ClientConfig,
    mut outbound: Option<mpsc::Receiver<String>>,
    events: mpsc::Sender<LinkEvent>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff = config.reconnect_min;

    loop {
        debug!(url = %config.relay_url, "Connecting to relay");

        match connect_async(config.relay_url.as_str()).await {
            Ok((ws, _)) => {
                backoff = config.reconnect_min;
                connected.store(true, Ordering::SeqCst);
                info!(url = %config.relay_url, "Connected to relay");
                if events.send(LinkEvent::Connected).await.is_err() {
                    return;
                }

                let end = run_session(ws, &mut outbound, &events).await;
                connected.store(false, Ordering::SeqCst);
                match end {
                    SessionEnd::Shutdown => {
                        debug!("Relay link shutting down");
                        return;
                    }
                    SessionEnd::Disconnected(reason) => {
                        warn!(reason = %reason, "Relay connection lost");
                        if events.send(LinkEvent::Disconnected).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    url = %config.relay_url,
                    error = %e,
                    retry_in_ms = backoff.as_millis(),
                    "Failed to connect to relay"
                );
            }
        }

        discard_queued(&mut outbound);

        tokio::select! {
            () = tokio::time::sleep(backoff) => {}
            () = events.closed() => return,
        }

        backoff = backoff.saturating_mul(2).min(config.reconnect_max);
    }
}

async fn run_session(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound: &mut Option<mpsc::Receiver<String>>,
    events: &mpsc::Sender<LinkEvent>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = decode(text.as_str()) else {
                            continue;
                        };
                        if events.send(event).await.is_err() {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Disconnected(String::from("closed by relay"));
                    }
                    Some(Err(e)) => return SessionEnd::Disconnected(e.to_string()),
                    Some(Ok(_)) => {}
                }
            }
            frame = next_outbound(outbound) => {
                match frame {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::text(text)).await {
                            return SessionEnd::Disconnected(format!("send failed: {e}"));
                        }
                    }
                    None => {
                        debug!("Outbound queue closed, link is now receive-only");
                        *outbound = None;
                    }
                }
            }
            () = events.closed() => {
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
        }
    }
}

async fn next_outbound(outbound: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match outbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn discard_queued(outbound: &mut Option<mpsc::Receiver<String>>) {
    let Some(rx) = outbound.as_mut() else {
        return;
    };
    let mut dropped = 0_usize;
    while rx.try_recv().is_ok() {
        dropped = dropped.saturating_add(1);
    }
    if dropped > 0 {
        debug!(dropped, "Discarded reports queued before disconnect");
    }
}

fn decode(text: &str) -> Option<LinkEvent> {
    match ServerEvent::from_frame(text) {
        Ok(ServerEvent::BusLocations(list)) => Some(LinkEvent::Snapshot(list)),
        Ok(ServerEvent::Error { message }) => Some(LinkEvent::Rejected(message)),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable frame from relay");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_snapshot_and_error_frames() {
        assert_eq!(
            decode(r#"{"event":"busLocations","data":[]}"#),
            Some(LinkEvent::Snapshot(Vec::new()))
        );
        assert_eq!(
            decode(r#"{"event":"error","data":{"message":"missing busId"}}"#),
            Some(LinkEvent::Rejected(String::from("missing busId")))
        );
        assert_eq!(decode("garbage"), None);
    }

    #[test]
    fn queued_reports_are_discarded() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(String::from("a")).unwrap();
        tx.try_send(String::from("b")).unwrap();
        let mut outbound = Some(rx);
        discard_queued(&mut outbound);
        assert!(outbound.as_mut().unwrap().try_recv().is_err());
    }
}
