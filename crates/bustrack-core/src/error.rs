//! Error types for the ingestion pipeline and relay configuration.

use chrono::{DateTime, Utc};

/// A position report that is structurally unusable.
///
/// These are returned only to the producer that sent the report; they never
/// reach the broadcast hub.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// `busId` missing or blank.
    #[error("missing busId")]
    MissingBusId,

    /// `routeId` missing or blank.
    #[error("missing routeId")]
    MissingRouteId,

    /// `position` object missing.
    #[error("missing position")]
    MissingPosition,

    /// `position.lat` or `position.lng` missing.
    #[error("missing position.{0}")]
    MissingCoordinate(&'static str),

    /// A coordinate is NaN, infinite, or outside its WGS84 range.
    #[error("position.{field} out of range: {value}")]
    CoordinateOutOfRange {
        /// Which coordinate, `lat` or `lng`.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Reasons the ingestion endpoint refuses a report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    /// The report failed structural validation.
    #[error("invalid report: {0}")]
    Invalid(#[from] ValidationError),

    /// The relay keeps the newest timestamp per vehicle and this report is
    /// older than the stored one.
    #[error("stale report for {bus_id}: reported {reported}, stored {stored}")]
    Stale {
        /// Vehicle the report was for.
        bus_id: String,
        /// Timestamp carried by the rejected report.
        reported: DateTime<Utc>,
        /// Timestamp of the entry that was kept.
        stored: DateTime<Utc>,
    },
}

/// Errors that can occur when loading relay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}
