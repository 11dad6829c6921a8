//! Driver-side producer for Bustrack.
//!
//! The driver device samples a [`LocationSensor`](sensor::LocationSensor)
//! and reports each fix to the relay as a `busLocation` frame. The
//! [`Tracker`](tracker::Tracker) owns the `idle`/`tracking` state machine;
//! the relay link is just an [`UpdateSink`](tracker::UpdateSink).
//!
//! # Modules
//!
//! - [`sensor`] -- sensor trait, sampling options, simulated receivers
//! - [`tracker`] -- the sampling loop and manual updates
//! - [`throttle`] -- optional interval and distance gating
//! - [`activity`] -- bounded activity log shown to the driver
//! - [`command`] -- terminal line commands
//! - [`config`] -- environment settings

pub mod activity;
pub mod command;
pub mod config;
pub mod sensor;
pub mod throttle;
pub mod tracker;

pub use activity::{ActivityEntry, ActivityKind, ActivityLog};
pub use command::{Command, CommandError};
pub use config::{DriverConfig, SensorKind};
pub use sensor::{
    FixedSensor, Fix, LocationSensor, NoSensor, RouteWalkSensor, SamplingOptions, SensorError,
    SensorWatch, DEFAULT_POSITION,
};
pub use throttle::Throttle;
pub use tracker::{Selection, Tracker, TrackerError, TrackerState, UpdateSink};
