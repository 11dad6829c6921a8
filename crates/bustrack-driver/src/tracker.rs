//! The driver's sampling loop.
//!
//! ```text
//!   idle --start()--> tracking --stop()--> idle
//!                        |
//!                        +--fatal sensor error--> idle (error recorded)
//! ```
//!
//! While tracking, each fix from the sensor that passes the throttle becomes
//! exactly one report handed to the [`UpdateSink`]. Sample handling and
//! [`Tracker::stop`] take the same lock, so once `stop` returns no further
//! report is submitted.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bustrack_client::{LinkError, LinkHandle};
use bustrack_types::{BusLocationReport, BusStatus, Position, ReportedPosition};
use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::activity::{ActivityEntry, ActivityKind, ActivityLog};
use crate::sensor::{Fix, LocationSensor, SamplingOptions, SensorError, SensorWatch, DEFAULT_POSITION};
use crate::throttle::Throttle;

/// Where reports go. Submission must not block.
pub trait UpdateSink: Send + Sync + 'static {
    /// Hand one report over for delivery.
    ///
    /// # Errors
    ///
    /// Returns the reason the report could not be queued.
    fn submit(&self, report: BusLocationReport) -> Result<(), LinkError>;
}

impl UpdateSink for LinkHandle {
    fn submit(&self, report: BusLocationReport) -> Result<(), LinkError> {
        self.send(report)
    }
}

/// Tracker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Not sampling.
    Idle,
    /// Sampling and reporting.
    Tracking,
}

/// What the driver has picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected route.
    pub route_id: Option<String>,
    /// Selected bus.
    pub bus_id: Option<String>,
    /// Status attached to every report.
    pub status: BusStatus,
}

/// Reasons a tracker operation is refused.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// No route selected.
    #[error("select a route first")]
    MissingRoute,

    /// No bus selected.
    #[error("select a bus first")]
    MissingBus,

    /// `start` while already tracking.
    #[error("already tracking")]
    AlreadyTracking,

    /// The named setting is locked while tracking.
    #[error("cannot change {0} while tracking")]
    Locked(&'static str),

    /// The sensor failed its capability check.
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// The report could not be handed to the link.
    #[error("send failed: {0}")]
    Send(#[from] LinkError),
}

#[derive(Debug)]
struct Inner {
    state: TrackerState,
    generation: u64,
    selection: Selection,
    sensor: Arc<dyn LocationSensor>,
    options: SamplingOptions,
    throttle: Throttle,
    last_fix: Option<Position>,
    last_error: Option<SensorError>,
    log: ActivityLog,
    loop_task: Option<AbortHandle>,
    sensor_task: Option<AbortHandle>,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.state == TrackerState::Tracking && self.generation == generation
    }

    fn enter_idle(&mut self) {
        self.state = TrackerState::Idle;
        if let Some(sensor) = self.sensor_task.take() {
            sensor.abort();
        }
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
    }

    fn report(&self, position: Position, at: DateTime<Utc>) -> Result<BusLocationReport, TrackerError> {
        let route_id = self.selection.route_id.clone().ok_or(TrackerError::MissingRoute)?;
        let bus_id = self.selection.bus_id.clone().ok_or(TrackerError::MissingBus)?;
        Ok(BusLocationReport {
            bus_id: Some(bus_id),
            route_id: Some(route_id),
            position: Some(ReportedPosition::from(position)),
            status: Some(self.selection.status),
            timestamp: Some(at),
        })
    }
}

/// Producer state machine around one sensor and one sink.
#[derive(Debug)]
pub struct Tracker<S> {
    inner: Arc<Mutex<Inner>>,
    sink: Arc<S>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: UpdateSink> Tracker<S> {
    /// Idle tracker with no selection.
    pub fn new(sensor: Arc<dyn LocationSensor>, sink: Arc<S>) -> Self {
        Self::with_options(sensor, sink, SamplingOptions::default(), Throttle::default())
    }

    /// Idle tracker with explicit sampling options and throttle.
    pub fn with_options(
        sensor: Arc<dyn LocationSensor>,
        sink: Arc<S>,
        options: SamplingOptions,
        throttle: Throttle,
    ) -> Self {
        let inner = Inner {
            state: TrackerState::Idle,
            generation: 0,
            selection: Selection::default(),
            sensor,
            options,
            throttle,
            last_fix: None,
            last_error: None,
            log: ActivityLog::default(),
            loop_task: None,
            sensor_task: None,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            sink,
        }
    }

    /// Begin sampling. Must be called from within a Tokio runtime.
    ///
    /// Fails without changing state if route or bus is unselected, if
    /// already tracking, or if the sensor capability check fails.
    pub fn start(&self) -> Result<(), TrackerError> {
        let mut inner = lock(&self.inner);
        if inner.state == TrackerState::Tracking {
            return Err(TrackerError::AlreadyTracking);
        }
        if inner.selection.route_id.is_none() {
            inner.log.error("select a route first");
            return Err(TrackerError::MissingRoute);
        }
        if inner.selection.bus_id.is_none() {
            inner.log.error("select a bus first");
            return Err(TrackerError::MissingBus);
        }
        if let Err(e) = inner.sensor.capability() {
            warn!(error = %e, "Sensor capability check failed");
            inner.log.error(format!("cannot start: {e}"));
            inner.last_error = Some(e.clone());
            return Err(TrackerError::Sensor(e));
        }

        inner.generation = inner.generation.saturating_add(1);
        let generation = inner.generation;
        inner.state = TrackerState::Tracking;
        inner.last_error = None;
        inner.throttle.reset();

        let watch = inner.sensor.watch(inner.options);
        inner.sensor_task = watch.abort_handle();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.inner),
            Arc::clone(&self.sink),
            watch,
            generation,
        ));
        inner.loop_task = Some(task.abort_handle());
        inner.log.info("tracking started");
        info!(
            bus_id = inner.selection.bus_id.as_deref().unwrap_or_default(),
            route_id = inner.selection.route_id.as_deref().unwrap_or_default(),
            "Tracking started"
        );
        Ok(())
    }

    /// Stop sampling. Returns `false` if already idle.
    pub fn stop(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state != TrackerState::Tracking {
            return false;
        }
        inner.enter_idle();
        inner.log.info("tracking stopped");
        info!("Tracking stopped");
        true
    }

    /// Start if idle, stop if tracking. Returns the new state.
    pub fn toggle(&self) -> Result<TrackerState, TrackerError> {
        if self.stop() {
            return Ok(TrackerState::Idle);
        }
        self.start()?;
        Ok(TrackerState::Tracking)
    }

    /// Send one report outside the sampling loop.
    ///
    /// Uses the last fix, or [`DEFAULT_POSITION`] when there is none yet.
    pub fn manual_update(&self) -> Result<BusLocationReport, TrackerError> {
        let mut inner = lock(&self.inner);
        let position = inner.last_fix.unwrap_or(DEFAULT_POSITION);
        let report = match inner.report(position, Utc::now()) {
            Ok(report) => report,
            Err(e) => {
                inner.log.error(e.to_string());
                return Err(e);
            }
        };
        match self.sink.submit(report.clone()) {
            Ok(()) => {
                inner
                    .log
                    .info(format!("manual update sent: {:.6}, {:.6}", position.lat, position.lng));
                Ok(report)
            }
            Err(e) => {
                inner.log.error(format!("manual update failed: {e}"));
                Err(TrackerError::Send(e))
            }
        }
    }

    /// Select a route. Locked while tracking.
    pub fn select_route(&self, route_id: impl Into<String>) -> Result<(), TrackerError> {
        let mut inner = lock(&self.inner);
        if inner.state == TrackerState::Tracking {
            return Err(TrackerError::Locked("route"));
        }
        inner.selection.route_id = Some(route_id.into());
        Ok(())
    }

    /// Select a bus. Locked while tracking.
    pub fn select_bus(&self, bus_id: impl Into<String>) -> Result<(), TrackerError> {
        let mut inner = lock(&self.inner);
        if inner.state == TrackerState::Tracking {
            return Err(TrackerError::Locked("bus"));
        }
        inner.selection.bus_id = Some(bus_id.into());
        Ok(())
    }

    /// Change the reported status. Takes effect on the next report.
    pub fn set_status(&self, status: BusStatus) {
        let mut inner = lock(&self.inner);
        inner.selection.status = status;
        inner.log.info(format!("status set to {status}"));
    }

    /// Swap the sensor. Locked while tracking.
    pub fn set_sensor(&self, sensor: Arc<dyn LocationSensor>) -> Result<(), TrackerError> {
        let mut inner = lock(&self.inner);
        if inner.state == TrackerState::Tracking {
            return Err(TrackerError::Locked("sensor"));
        }
        inner.sensor = sensor;
        Ok(())
    }

    /// Add an entry to the activity log.
    pub fn record(&self, kind: ActivityKind, message: impl Into<String>) {
        lock(&self.inner).log.push(kind, message);
    }

    /// Current state.
    pub fn state(&self) -> TrackerState {
        lock(&self.inner).state
    }

    /// Current selection.
    pub fn selection(&self) -> Selection {
        lock(&self.inner).selection.clone()
    }

    /// Most recent fix, admitted by the throttle or not.
    pub fn last_fix(&self) -> Option<Position> {
        lock(&self.inner).last_fix
    }

    /// The sensor error that last ended or prevented tracking.
    pub fn last_error(&self) -> Option<SensorError> {
        lock(&self.inner).last_error.clone()
    }

    /// Activity log, newest first.
    pub fn activity(&self) -> Vec<ActivityEntry> {
        lock(&self.inner).log.iter().cloned().collect()
    }
}

impl<S> Drop for Tracker<S> {
    fn drop(&mut self) {
        lock(&self.inner).enter_idle();
    }
}

async fn run_loop<S: UpdateSink>(
    inner: Arc<Mutex<Inner>>,
    sink: Arc<S>,
    mut watch: SensorWatch,
    generation: u64,
) {
    while let Some(sample) = watch.next().await {
        if handle_sample(&inner, sink.as_ref(), generation, sample).is_break() {
            return;
        }
    }

    let mut inner = lock(&inner);
    if inner.is_current(generation) {
        warn!("Sensor stream ended");
        inner.enter_idle();
        inner.log.error("sensor stopped, tracking ended");
    }
}

fn handle_sample<S: UpdateSink>(
    inner: &Mutex<Inner>,
    sink: &S,
    generation: u64,
    sample: Result<Fix, SensorError>,
) -> ControlFlow<()> {
    let mut inner = lock(inner);
    if !inner.is_current(generation) {
        return ControlFlow::Break(());
    }

    match sample {
        Ok(fix) => {
            inner.last_fix = Some(fix.position);
            if !inner.throttle.admit(&fix) {
                debug!("Fix throttled");
                return ControlFlow::Continue(());
            }
            let report = match inner.report(fix.position, fix.taken_at) {
                Ok(report) => report,
                Err(e) => {
                    inner.log.error(e.to_string());
                    return ControlFlow::Continue(());
                }
            };
            match sink.submit(report) {
                Ok(()) => {
                    debug!(lat = fix.position.lat, lng = fix.position.lng, "Position sent");
                    inner.log.info(format!(
                        "position sent: {:.6}, {:.6}",
                        fix.position.lat, fix.position.lng
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Position not sent");
                    inner.log.error(format!("send failed: {e}"));
                }
            }
            ControlFlow::Continue(())
        }
        Err(e) if e.is_fatal() => {
            warn!(error = %e, "Sensor failed, tracking stopped");
            inner.log.error(format!("sensor error: {e}"));
            inner.last_error = Some(e);
            inner.enter_idle();
            inner.log.info("tracking stopped");
            ControlFlow::Break(())
        }
        Err(e) => {
            warn!(error = %e, "Location sample failed");
            inner.log.error(format!("location error: {e}"));
            ControlFlow::Continue(())
        }
    }
}
