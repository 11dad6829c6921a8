//! Optional rate and distance gating of sensor fixes.
//!
//! Both limits are off by default, in which case every fix is reported.
//! When both are set a fix must satisfy both.

use std::time::Duration;

use bustrack_types::Position;
use chrono::{DateTime, Utc};

use crate::sensor::Fix;

/// Decides which fixes become reports.
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    min_interval: Option<Duration>,
    min_distance_m: Option<f64>,
    last: Option<(DateTime<Utc>, Position)>,
}

impl Throttle {
    /// Throttle with the given limits; `None` disables a limit.
    pub const fn new(min_interval: Option<Duration>, min_distance_m: Option<f64>) -> Self {
        Self {
            min_interval,
            min_distance_m,
            last: None,
        }
    }

    /// Whether any limit is active.
    pub const fn is_enabled(&self) -> bool {
        self.min_interval.is_some() || self.min_distance_m.is_some()
    }

    /// Forget the last admitted fix so the next one always passes.
    pub const fn reset(&mut self) {
        self.last = None;
    }

    /// Admit or drop `fix`. Admitted fixes become the new reference point.
    pub fn admit(&mut self, fix: &Fix) -> bool {
        if let Some((at, position)) = self.last {
            let elapsed = fix.taken_at.signed_duration_since(at).to_std();
            if self
                .min_interval
                .is_some_and(|min| !elapsed.is_ok_and(|elapsed| elapsed >= min))
            {
                return false;
            }
            if self
                .min_distance_m
                .is_some_and(|min| position.distance_m(&fix.position) < min)
            {
                return false;
            }
        }
        self.last = Some((fix.taken_at, fix.position));
        true
    }
}
