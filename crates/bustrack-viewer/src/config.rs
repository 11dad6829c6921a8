//! Viewer settings loaded from the environment.
//!
//! - `BUSTRACK_SIMULATE` -- show simulated demo buses (default `true`)
//! - `BUSTRACK_SIM_INTERVAL_MS` -- simulation tick (default 3000)
//! - `BUSTRACK_ROUTE_FILTER` -- only show one route

use std::time::Duration;

use bustrack_client::ClientConfigError;

use crate::simulate::DEFAULT_INTERVAL;

/// Viewer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Whether to run the random-walk simulator.
    pub simulate: bool,
    /// Simulator tick.
    pub sim_interval: Duration,
    /// Route to restrict the table to.
    pub route_filter: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            simulate: true,
            sim_interval: DEFAULT_INTERVAL,
            route_filter: None,
        }
    }
}

impl ViewerConfig {
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

        if let Some(value) = lookup("BUSTRACK_SIMULATE") {
            config.simulate = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ClientConfigError::InvalidEnv {
                        var: "BUSTRACK_SIMULATE",
                        value,
                        reason: String::from("expected true or false"),
                    });
                }
            };
        }
        if let Some(value) = lookup("BUSTRACK_SIM_INTERVAL_MS") {
            config.sim_interval = match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ClientConfigError::InvalidEnv {
                        var: "BUSTRACK_SIM_INTERVAL_MS",
                        value,
                        reason: String::from("expected a positive number of milliseconds"),
                    });
                }
            };
        }
        config.route_filter = lookup("BUSTRACK_ROUTE_FILTER").filter(|v| !v.trim().is_empty());

        Ok(config)
    }
}
