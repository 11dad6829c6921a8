//! Enumeration types shared by the relay and its clients.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Operational status a driver attaches to each position report.
///
/// Serialized in lowercase. The driver page of the first deployment sent
/// `"delay"` instead of `"delayed"`, so that spelling is still accepted on
/// input; output always uses `"delayed"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    /// In service, running normally.
    #[default]
    Active,
    /// In service, behind schedule.
    #[serde(alias = "delay")]
    Delayed,
    /// In service, no capacity left.
    Full,
    /// Out of service.
    Maintenance,
}

impl BusStatus {
    /// The wire spelling of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Delayed => "delayed",
            Self::Full => "full",
            Self::Maintenance => "maintenance",
        }
    }
}

impl core::fmt::Display for BusStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`BusStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl core::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "unknown bus status {:?} (expected active, delayed, full or maintenance)",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

impl core::str::FromStr for BusStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "delayed" | "delay" => Ok(Self::Delayed),
            "full" => Ok(Self::Full),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}
