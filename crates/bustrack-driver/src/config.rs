//! Driver settings loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `BUSTRACK_BUS_ID` | unset | Preselected bus |
//! | `BUSTRACK_ROUTE_ID` | unset | Preselected route |
//! | `BUSTRACK_STATUS` | `active` | Initial status |
//! | `BUSTRACK_SENSOR` | `route` | `route` walks the route path, `fixed` stays put |
//! | `BUSTRACK_SAMPLE_INTERVAL_MS` | `2000` | Time between simulated fixes |
//! | `BUSTRACK_MIN_INTERVAL_MS` | unset | Throttle: minimum time between reports |
//! | `BUSTRACK_MIN_DISTANCE_M` | unset | Throttle: minimum movement between reports |
//! | `BUSTRACK_FAILURE_RATE` | `0` | Probability a simulated fix fails |
//! | `BUSTRACK_AUTOSTART` | `false` | Start tracking immediately |

use std::time::Duration;

use bustrack_client::ClientConfigError;
use bustrack_types::BusStatus;

/// Which simulated sensor to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SensorKind {
    /// Follow the selected route's path.
    #[default]
    Route,
    /// Stay at the selected bus's catalog position.
    Fixed,
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Preselected bus.
    pub bus_id: Option<String>,
    /// Preselected route.
    pub route_id: Option<String>,
    /// Initial status.
    pub status: BusStatus,
    /// Simulated sensor type.
    pub sensor: SensorKind,
    /// Time between simulated fixes.
    pub sample_interval: Duration,
    /// Minimum time between reports.
    pub min_interval: Option<Duration>,
    /// Minimum movement between reports, in metres.
    pub min_distance_m: Option<f64>,
    /// Probability that a simulated fix fails.
    pub failure_rate: f64,
    /// Start tracking right after launch.
    pub autostart: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bus_id: None,
            route_id: None,
            status: BusStatus::Active,
            sensor: SensorKind::Route,
            sample_interval: Duration::from_millis(2000),
            min_interval: None,
            min_distance_m: None,
            failure_rate: 0.0,
            autostart: false,
        }
    }
}

impl DriverConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::InvalidEnv`] for unusable values.
    pub fn from_env() -> Result<Self, ClientConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::InvalidEnv`] for unusable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        config.bus_id = get("BUSTRACK_BUS_ID");
        config.route_id = get("BUSTRACK_ROUTE_ID");

        if let Some(value) = get("BUSTRACK_STATUS") {
            config.status = value.parse().map_err(|e| invalid("BUSTRACK_STATUS", &value, e))?;
        }
        if let Some(value) = get("BUSTRACK_SENSOR") {
            config.sensor = match value.trim().to_ascii_lowercase().as_str() {
                "route" => SensorKind::Route,
                "fixed" => SensorKind::Fixed,
                _ => return Err(invalid("BUSTRACK_SENSOR", &value, "expected route or fixed")),
            };
        }
        if let Some(value) = get("BUSTRACK_SAMPLE_INTERVAL_MS") {
            config.sample_interval = millis("BUSTRACK_SAMPLE_INTERVAL_MS", &value)?;
        }
        if let Some(value) = get("BUSTRACK_MIN_INTERVAL_MS") {
            config.min_interval = Some(millis("BUSTRACK_MIN_INTERVAL_MS", &value)?);
        }
        if let Some(value) = get("BUSTRACK_MIN_DISTANCE_M") {
            let metres: f64 = value
                .trim()
                .parse()
                .map_err(|e| invalid("BUSTRACK_MIN_DISTANCE_M", &value, e))?;
            if !metres.is_finite() || metres < 0.0 {
                return Err(invalid("BUSTRACK_MIN_DISTANCE_M", &value, "must be a non-negative number"));
            }
            config.min_distance_m = Some(metres);
        }
        if let Some(value) = get("BUSTRACK_FAILURE_RATE") {
            let rate: f64 = value
                .trim()
                .parse()
                .map_err(|e| invalid("BUSTRACK_FAILURE_RATE", &value, e))?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("BUSTRACK_FAILURE_RATE", &value, "must be between 0 and 1"));
            }
            config.failure_rate = rate;
        }
        if let Some(value) = get("BUSTRACK_AUTOSTART") {
            config.autostart = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid("BUSTRACK_AUTOSTART", &value, "expected true or false")),
            };
        }

        Ok(config)
    }
}

fn millis(var: &'static str, value: &str) -> Result<Duration, ClientConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, value, "must be positive")),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(invalid(var, value, e)),
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ClientConfigError {
    ClientConfigError::InvalidEnv {
        var,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from(vars: &[(&str, &str)]) -> Result<DriverConfig, ClientConfigError> {
        DriverConfig::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        })
    }

    #[test]
    fn defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config, DriverConfig::default());
        assert!(config.min_interval.is_none());
        assert!(config.min_distance_m.is_none());
        assert!(!config.autostart);
    }

    #[test]
    fn full_environment() {
        let config = from(&[
            ("BUSTRACK_BUS_ID", "bus201"),
            ("BUSTRACK_ROUTE_ID", "route2"),
            ("BUSTRACK_STATUS", "full"),
            ("BUSTRACK_SENSOR", "fixed"),
            ("BUSTRACK_SAMPLE_INTERVAL_MS", "500"),
            ("BUSTRACK_MIN_INTERVAL_MS", "3000"),
            ("BUSTRACK_MIN_DISTANCE_M", "25"),
            ("BUSTRACK_FAILURE_RATE", "0.1"),
            ("BUSTRACK_AUTOSTART", "yes"),
        ])
        .unwrap();
        assert_eq!(config.bus_id.as_deref(), Some("bus201"));
        assert_eq!(config.route_id.as_deref(), Some("route2"));
        assert_eq!(config.status, BusStatus::Full);
        assert_eq!(config.sensor, SensorKind::Fixed);
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.min_interval, Some(Duration::from_secs(3)));
        assert_eq!(config.min_distance_m, Some(25.0));
        assert!(config.autostart);
    }

    #[test]
    fn blank_ids_are_unset() {
        let config = from(&[("BUSTRACK_BUS_ID", "  ")]).unwrap();
        assert!(config.bus_id.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(from(&[("BUSTRACK_STATUS", "flying")]).is_err());
        assert!(from(&[("BUSTRACK_SENSOR", "gps")]).is_err());
        assert!(from(&[("BUSTRACK_SAMPLE_INTERVAL_MS", "0")]).is_err());
        assert!(from(&[("BUSTRACK_MIN_DISTANCE_M", "-3")]).is_err());
        assert!(from(&[("BUSTRACK_FAILURE_RATE", "1.5")]).is_err());
        assert!(from(&[("BUSTRACK_AUTOSTART", "maybe")]).is_err());
    }
}
