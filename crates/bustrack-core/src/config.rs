//! Configuration loading and typed config structures for the relay.
//!
//! Configuration lives in an optional YAML file (`bustrack.yaml` in the
//! working directory, or the path in `BUSTRACK_CONFIG`). Every field has a
//! default, so the relay runs with no file at all. Environment variables
//! override the file for the values deployments usually set.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "bustrack.yaml";

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Listen address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Ingestion policy.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied on top of the file:
    /// - `BUSTRACK_HOST` overrides `server.host`
    /// - `PORT`, then `BUSTRACK_PORT`, override `server.port`
    /// - `BUSTRACK_ORDERING` overrides `ingest.ordering`
    /// - `BUSTRACK_LOG_LEVEL` overrides `logging.level`
    /// - `BUSTRACK_LOG_FORMAT` overrides `logging.format`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from `BUSTRACK_CONFIG` or [`DEFAULT_CONFIG_FILE`] if present,
    /// otherwise start from defaults. Environment overrides apply either way.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BUSTRACK_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        if path.exists() {
            Self::from_file(&path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides()?;
            Ok(config)
        }
    }

    /// Override fields from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BUSTRACK_HOST") {
            self.server.host = host;
        }
        for var in ["PORT", "BUSTRACK_PORT"] {
            if let Some(value) = lookup(var) {
                self.server.port = value
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::InvalidEnv {
                        var,
                        value: value.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }
        if let Some(value) = lookup("BUSTRACK_ORDERING") {
            self.ingest.ordering = IngestOrdering::from_name(&value).ok_or_else(|| {
                ConfigError::InvalidEnv {
                    var: "BUSTRACK_ORDERING",
                    value: value.clone(),
                    reason: String::from("expected last_write_wins or newest_timestamp"),
                }
            })?;
        }
        if let Some(level) = lookup("BUSTRACK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(value) = lookup("BUSTRACK_LOG_FORMAT") {
            self.logging.format = match value.trim() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "BUSTRACK_LOG_FORMAT",
                        value,
                        reason: String::from("expected text or json"),
                    });
                }
            };
        }
        Ok(())
    }
}

/// Relay listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` as a single string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// How the store resolves two reports for the same vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOrdering {
    /// The last report applied wins, whatever its timestamp.
    #[default]
    LastWriteWins,
    /// Reports older than the stored one are rejected.
    NewestTimestamp,
}

impl IngestOrdering {
    /// Parse the snake case name used in YAML and environment values.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "last_write_wins" => Some(Self::LastWriteWins),
            "newest_timestamp" => Some(Self::NewestTimestamp),
            _ => None,
        }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct IngestConfig {
    /// Conflict policy for reports of the same vehicle.
    #[serde(default)]
    pub ordering: IngestOrdering,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = RelayConfig::default();
        assert_eq!(config.server.address(), "0.0.0.0:3001");
        assert_eq!(config.ingest.ordering, IngestOrdering::LastWriteWins);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 4000

ingest:
  ordering: newest_timestamp

logging:
  level: "bustrack_relay=debug,info"
  format: json
"#;
        let config = RelayConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.ingest.ordering, IngestOrdering::NewestTimestamp);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config = RelayConfig::parse("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn env_overrides_apply_in_order() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides(env(&[
                ("BUSTRACK_HOST", "127.0.0.1"),
                ("PORT", "5000"),
                ("BUSTRACK_PORT", "5001"),
                ("BUSTRACK_ORDERING", "newest_timestamp"),
                ("BUSTRACK_LOG_FORMAT", "json"),
            ]))
            .unwrap();
        assert_eq!(config.server.address(), "127.0.0.1:5001");
        assert_eq!(config.ingest.ordering, IngestOrdering::NewestTimestamp);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_env_is_reported() {
        let mut config = RelayConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));

        let err = config
            .apply_overrides(env(&[("BUSTRACK_ORDERING", "random")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "BUSTRACK_ORDERING", .. }));
    }
}
