//! Location sensors.
//!
//! A [`LocationSensor`] is checked once for capability and then watched:
//! [`LocationSensor::watch`] starts a producer task and returns a
//! [`SensorWatch`] yielding one result per sample. Dropping the watch, or
//! aborting it through [`SensorWatch::abort_handle`], stops sampling.
//!
//! Implementations:
//!
//! - [`RouteWalkSensor`] -- simulated receiver driving along a route polyline
//! - [`FixedSensor`] -- stationary receiver
//! - [`NoSensor`] -- device without positioning

use std::fmt;
use std::time::Duration;

use bustrack_types::Position;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Terminal Pusat, used whenever no real fix is available.
pub const DEFAULT_POSITION: Position = Position::new(-6.2088, 106.8456);

const WATCH_CAPACITY: usize = 16;
const STEPS_PER_SEGMENT: u32 = 10;

/// Sampling request passed to [`LocationSensor::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingOptions {
    /// Prefer precise fixes over fast ones.
    pub high_accuracy: bool,
    /// Oldest cached fix that may be returned; zero means always fresh.
    pub max_cache_age: Duration,
    /// Longest wait for one fix before reporting [`SensorError::Timeout`].
    pub timeout: Duration,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_cache_age: Duration::ZERO,
            timeout: Duration::from_millis(5000),
        }
    }
}

/// One position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Measured position.
    pub position: Position,
    /// Estimated horizontal accuracy in metres.
    pub accuracy_m: f64,
    /// When the sample was taken.
    pub taken_at: DateTime<Utc>,
}

/// Sensor failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The device has no positioning capability.
    #[error("location sensor unavailable")]
    Unavailable,

    /// The user or platform refused access.
    #[error("location permission denied")]
    PermissionDenied,

    /// No fix arrived within the sampling timeout.
    #[error("no fix within {0:?}")]
    Timeout(Duration),

    /// Any other transient failure.
    #[error("location fix failed: {0}")]
    Failed(String),
}

impl SensorError {
    /// Whether tracking cannot continue after this error.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable | Self::PermissionDenied)
    }
}

/// Stream of samples from a running sensor.
#[derive(Debug)]
pub struct SensorWatch {
    rx: mpsc::Receiver<Result<Fix, SensorError>>,
    producer: Option<AbortHandle>,
}

impl SensorWatch {
    /// Wrap a receiver fed by the task behind `producer`.
    pub const fn new(
        rx: mpsc::Receiver<Result<Fix, SensorError>>,
        producer: Option<AbortHandle>,
    ) -> Self {
        Self { rx, producer }
    }

    /// Next sample, or `None` once the sensor has stopped.
    pub async fn next(&mut self) -> Option<Result<Fix, SensorError>> {
        self.rx.recv().await
    }

    /// Handle that stops the producer without consuming the watch.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.producer.clone()
    }
}

impl Drop for SensorWatch {
    fn drop(&mut self) {
        if let Some(producer) = &self.producer {
            producer.abort();
        }
    }
}

/// A source of position fixes.
pub trait LocationSensor: Send + Sync + fmt::Debug {
    /// Check that the sensor can produce fixes at all.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] or
    /// [`SensorError::PermissionDenied`] when it cannot.
    fn capability(&self) -> Result<(), SensorError>;

    /// Start sampling. Must be called from within a Tokio runtime.
    fn watch(&self, options: SamplingOptions) -> SensorWatch;
}

// ---------------------------------------------------------------------------
// RouteWalkSensor
// ---------------------------------------------------------------------------

/// Simulated receiver that drives along a polyline and loops at the end.
#[derive(Debug, Clone)]
pub struct RouteWalkSensor {
    path: Vec<Position>,
    interval: Duration,
    failure_rate: f64,
    seed: Option<u64>,
}

impl RouteWalkSensor {
    /// Walk `path`, producing one fix per `interval`.
    pub const fn new(path: Vec<Position>, interval: Duration) -> Self {
        Self {
            path,
            interval,
            failure_rate: 0.0,
            seed: None,
        }
    }

    /// Make each sample fail with probability `rate` (clamped to `0..=1`).
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Use a deterministic random source.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl LocationSensor for RouteWalkSensor {
    fn capability(&self) -> Result<(), SensorError> {
        if self.path.is_empty() {
            return Err(SensorError::Unavailable);
        }
        Ok(())
    }

    fn watch(&self, options: SamplingOptions) -> SensorWatch {
        let (tx, rx) = mpsc::channel(WATCH_CAPACITY);
        let mut walk = Walk::new(self.path.clone());
        let interval = self.interval;
        let failure_rate = self.failure_rate;
        let mut rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let (jitter, accuracy_m) = if options.high_accuracy {
            (0.000_02, 5.0)
        } else {
            (0.000_2, 50.0)
        };

        let task = tokio::spawn(async move {
            loop {
                let sample = if interval > options.timeout {
                    tokio::time::sleep(options.timeout).await;
                    Err(SensorError::Timeout(options.timeout))
                } else {
                    tokio::time::sleep(interval).await;
                    if failure_rate > 0.0 && rng.random_bool(failure_rate) {
                        Err(SensorError::Failed(String::from("receiver lost satellite lock")))
                    } else {
                        let position = walk.advance().offset(
                            rng.random_range(-jitter..=jitter),
                            rng.random_range(-jitter..=jitter),
                        );
                        Ok(Fix {
                            position,
                            accuracy_m,
                            taken_at: Utc::now(),
                        })
                    }
                };
                if tx.send(sample).await.is_err() {
                    break;
                }
            }
        });

        SensorWatch::new(rx, Some(task.abort_handle()))
    }
}

/// Position along a looping polyline in fixed steps per segment.
#[derive(Debug, Clone)]
struct Walk {
    path: Vec<Position>,
    segment: usize,
    step: u32,
}

impl Walk {
    const fn new(path: Vec<Position>) -> Self {
        Self {
            path,
            segment: 0,
            step: 0,
        }
    }

    fn advance(&mut self) -> Position {
        let Some(&start) = self.path.get(self.segment) else {
            return self.path.first().copied().unwrap_or(DEFAULT_POSITION);
        };
        let next = self.segment.saturating_add(1);
        let Some(&end) = self.path.get(next) else {
            return start;
        };

        let t = f64::from(self.step) / f64::from(STEPS_PER_SEGMENT);
        let position = start.offset((end.lat - start.lat) * t, (end.lng - start.lng) * t);

        self.step = self.step.saturating_add(1);
        if self.step >= STEPS_PER_SEGMENT {
            self.step = 0;
            self.segment = if next.saturating_add(1) < self.path.len() { next } else { 0 };
        }
        position
    }
}

// ---------------------------------------------------------------------------
// FixedSensor / NoSensor
// ---------------------------------------------------------------------------

/// Receiver that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    position: Position,
    interval: Duration,
}

impl FixedSensor {
    /// Report `position` once per `interval`.
    pub const fn new(position: Position, interval: Duration) -> Self {
        Self { position, interval }
    }
}

impl LocationSensor for FixedSensor {
    fn capability(&self) -> Result<(), SensorError> {
        Ok(())
    }

    fn watch(&self, _options: SamplingOptions) -> SensorWatch {
        let (tx, rx) = mpsc::channel(WATCH_CAPACITY);
        let Self { position, interval } = *self;
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let fix = Fix {
                    position,
                    accuracy_m: 1.0,
                    taken_at: Utc::now(),
                };
                if tx.send(Ok(fix)).await.is_err() {
                    break;
                }
            }
        });
        SensorWatch::new(rx, Some(task.abort_handle()))
    }
}

/// A device without positioning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl LocationSensor for NoSensor {
    fn capability(&self) -> Result<(), SensorError> {
        Err(SensorError::Unavailable)
    }

    fn watch(&self, _options: SamplingOptions) -> SensorWatch {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Err(SensorError::Unavailable));
        SensorWatch::new(rx, None)
    }
}
