//! Link configuration loaded from the environment.
//!
//! - `BUSTRACK_RELAY_URL` -- relay socket endpoint (default
//!   `ws://localhost:3001/ws`)
//! - `BUSTRACK_RECONNECT_MIN_MS` -- first reconnect delay (default 1000)
//! - `BUSTRACK_RECONNECT_MAX_MS` -- backoff ceiling (default 5000)

use std::time::Duration;

use crate::error::ClientConfigError;

/// Relay endpoint used when `BUSTRACK_RELAY_URL` is unset.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:3001/ws";

/// Connection settings for one relay link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `ws://` URL of the relay socket.
    pub relay_url: String,
    /// Delay before the first reconnect attempt.
    pub reconnect_min: Duration,
    /// Upper bound for the doubling reconnect delay.
    pub reconnect_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: String::from(DEFAULT_RELAY_URL),
            reconnect_min: Duration::from_millis(1000),
            reconnect_max: Duration::from_millis(5000),
        }
    }
}

impl ClientConfig {
    /// Config for `relay_url` with default backoff.
    pub fn for_url(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::InvalidEnv`] if a variable is set but
    /// unusable.
    pub fn from_env() -> Result<Self, ClientConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::InvalidEnv`] if a variable is set but
    /// unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BUSTRACK_RELAY_URL") {
            config.relay_url = check_url(url)?;
        }
        if let Some(ms) = lookup("BUSTRACK_RECONNECT_MIN_MS") {
            config.reconnect_min = parse_millis("BUSTRACK_RECONNECT_MIN_MS", ms)?;
        }
        if let Some(ms) = lookup("BUSTRACK_RECONNECT_MAX_MS") {
            config.reconnect_max = parse_millis("BUSTRACK_RECONNECT_MAX_MS", ms)?;
        }
        if config.reconnect_max < config.reconnect_min {
            return Err(ClientConfigError::InvalidEnv {
                var: "BUSTRACK_RECONNECT_MAX_MS",
                value: config.reconnect_max.as_millis().to_string(),
                reason: String::from("must not be below BUSTRACK_RECONNECT_MIN_MS"),
            });
        }

        Ok(config)
    }
}

fn check_url(url: String) -> Result<String, ClientConfigError> {
    if url.starts_with("ws://") {
        return Ok(url);
    }
    let reason = if url.starts_with("wss://") {
        "TLS endpoints are not supported, use ws://"
    } else {
        "expected a ws:// URL"
    };
    Err(ClientConfigError::InvalidEnv {
        var: "BUSTRACK_RELAY_URL",
        value: url,
        reason: String::from(reason),
    })
}

fn parse_millis(var: &'static str, value: String) -> Result<Duration, ClientConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        Ok(_) => Err(ClientConfigError::InvalidEnv {
            var,
            value,
            reason: String::from("must be positive"),
        }),
        Err(e) => Err(ClientConfigError::InvalidEnv {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.relay_url, "ws://localhost:3001/ws");
    }

    #[test]
    fn env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BUSTRACK_RELAY_URL", "ws://relay.local:9000/ws/ingest"),
            ("BUSTRACK_RECONNECT_MIN_MS", "250"),
            ("BUSTRACK_RECONNECT_MAX_MS", "8000"),
        ]))
        .unwrap();
        assert_eq!(config.relay_url, "ws://relay.local:9000/ws/ingest");
        assert_eq!(config.reconnect_min, Duration::from_millis(250));
        assert_eq!(config.reconnect_max, Duration::from_millis(8000));
    }

    #[test]
    fn rejects_non_websocket_url() {
        let err = ClientConfig::from_lookup(lookup(&[("BUSTRACK_RELAY_URL", "http://x")]));
        assert!(matches!(
            err,
            Err(ClientConfigError::InvalidEnv { var: "BUSTRACK_RELAY_URL", .. })
        ));
        let err = ClientConfig::from_lookup(lookup(&[("BUSTRACK_RELAY_URL", "wss://x")]));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_inverted_backoff() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("BUSTRACK_RECONNECT_MIN_MS", "9000"),
            ("BUSTRACK_RECONNECT_MAX_MS", "1000"),
        ]));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_zero_and_garbage_millis() {
        assert!(ClientConfig::from_lookup(lookup(&[("BUSTRACK_RECONNECT_MIN_MS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("BUSTRACK_RECONNECT_MIN_MS", "soon")])).is_err());
    }
}
