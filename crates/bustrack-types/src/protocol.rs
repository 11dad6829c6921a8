//! WebSocket frame envelopes.
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`
//! using the event names the browser clients were built against:
//!
//! | Direction | Event | Payload |
//! |-----------|-------|---------|
//! | producer → relay | `busLocation` | [`BusLocationReport`] |
//! | relay → viewer | `busLocations` | `[BusLocation]`, always the full set |
//! | relay → producer | `error` | `{message}` |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{BusLocation, BusLocationReport};

/// Frames a client may send to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// One position report from a driver device.
    BusLocation(BusLocationReport),
}

/// Frames the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// The complete current fleet, replacing whatever the client held.
    BusLocations(Vec<BusLocation>),
    /// A report from this client was rejected.
    Error {
        /// Human-readable rejection reason.
        message: String,
    },
}

impl ClientEvent {
    /// Encode as a JSON text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    pub fn from_frame(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl ServerEvent {
    /// Encode as a JSON text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    pub fn from_frame(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_matches_browser_shape() {
        let text = r#"{"event":"busLocation","data":{"busId":"bus101","routeId":"route1","position":{"lat":-6.208,"lng":106.847},"status":"active","timestamp":"2024-05-01T08:00:00.000Z"}}"#;
        let ClientEvent::BusLocation(report) = ClientEvent::from_frame(text).unwrap();
        assert_eq!(report.bus_id.as_deref(), Some("bus101"));
        assert_eq!(report.route_id.as_deref(), Some("route1"));
        assert!(report.timestamp.is_some());
    }

    #[test]
    fn empty_fleet_frame() {
        let frame = ServerEvent::BusLocations(Vec::new()).to_frame().unwrap();
        assert_eq!(frame, r#"{"event":"busLocations","data":[]}"#);
    }

    #[test]
    fn error_frame() {
        let frame = ServerEvent::Error {
            message: String::from("missing busId"),
        }
        .to_frame()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "missing busId");
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(ClientEvent::from_frame(r#"{"event":"scanTicket","data":{}}"#).is_err());
    }
}
