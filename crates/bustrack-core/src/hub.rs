//! Fan-out of fleet snapshots to connected viewer sessions.
//!
//! Each session owns a latest-value slot ([`tokio::sync::watch`]). Publishing
//! overwrites every slot without waiting on any reader, so a slow or stalled
//! viewer never delays the others; when it catches up it skips straight to
//! the newest snapshot, which is complete on its own.
//!
//! Sessions whose receiving half is gone are pruned on the next publish.

use std::collections::HashMap;
use std::sync::Arc;

use bustrack_types::{FleetSnapshot, SessionId};
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::store::PositionStore;

/// Outcome of one [`BroadcastHub::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sessions whose slot now holds the published snapshot.
    pub delivered: usize,
    /// Sessions removed because their receiver was dropped.
    pub pruned: usize,
}

/// A viewer's registration with the hub.
///
/// The first [`recv`](Self::recv) returns the hydration snapshot taken at
/// subscribe time; later calls wait for the next publish.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    rx: watch::Receiver<Arc<FleetSnapshot>>,
    hydrated: bool,
}

impl Subscription {
    /// Handle to pass to [`BroadcastHub::unsubscribe`].
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for the next snapshot addressed to this session.
    ///
    /// Returns `None` once the session has been unsubscribed. Cancel safe.
    pub async fn recv(&mut self) -> Option<Arc<FleetSnapshot>> {
        if !self.hydrated {
            self.hydrated = true;
            return Some(Arc::clone(&self.rx.borrow_and_update()));
        }
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }

    /// Return an unseen snapshot if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Arc<FleetSnapshot>> {
        if !self.hydrated {
            self.hydrated = true;
            return Some(Arc::clone(&self.rx.borrow_and_update()));
        }
        match self.rx.has_changed() {
            Ok(true) => Some(Arc::clone(&self.rx.borrow_and_update())),
            _ => None,
        }
    }
}

/// Registry of viewer sessions plus the store they are hydrated from.
#[derive(Debug)]
pub struct BroadcastHub {
    store: Arc<PositionStore>,
    sessions: Mutex<HashMap<SessionId, watch::Sender<Arc<FleetSnapshot>>>>,
}

impl BroadcastHub {
    /// Create a hub that hydrates new sessions from `store`.
    pub fn new(store: Arc<PositionStore>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a viewer and hand it the current snapshot.
    ///
    /// The hydration snapshot is taken while the session table is locked,
    /// so any update applied after it is guaranteed to reach this session
    /// through a later publish.
    pub async fn subscribe(&self) -> Subscription {
        let mut sessions = self.sessions.lock().await;
        let snapshot = Arc::new(self.store.snapshot().await);
        let revision = snapshot.revision;
        let vehicles = snapshot.len();
        let (tx, rx) = watch::channel(snapshot);
        let id = SessionId::new();
        sessions.insert(id, tx);
        debug!(session = %id, revision, vehicles, sessions = sessions.len(), "Viewer subscribed");
        Subscription {
            id,
            rx,
            hydrated: false,
        }
    }

    /// Remove a viewer. Returns `false` if it was already gone.
    pub async fn unsubscribe(&self, id: SessionId) -> bool {
        let removed = self.sessions.lock().await.remove(&id).is_some();
        if removed {
            debug!(session = %id, "Viewer unsubscribed");
        }
        removed
    }

    /// Deliver `snapshot` to every subscribed session.
    ///
    /// A session already holding the same or a newer revision keeps it, so
    /// slots only move forward even if publishes race.
    pub async fn publish(&self, snapshot: Arc<FleetSnapshot>) -> PublishReport {
        let mut report = PublishReport::default();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|id, tx| {
            if tx.is_closed() {
                debug!(session = %id, "Pruning disconnected viewer");
                report.pruned = report.pruned.saturating_add(1);
                return false;
            }
            tx.send_if_modified(|current| {
                if current.revision >= snapshot.revision {
                    return false;
                }
                *current = Arc::clone(&snapshot);
                true
            });
            report.delivered = report.delivered.saturating_add(1);
            true
        });
        report
    }

    /// Number of registered sessions, including ones not yet pruned.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// The store sessions are hydrated from.
    pub const fn store(&self) -> &Arc<PositionStore> {
        &self.store
    }
}
