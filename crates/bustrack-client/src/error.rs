//! Error types for the relay link and its configuration.

/// Reasons an outbound report could not be queued.
///
/// Delivery is fire-and-forget: a report that is queued may still be lost
/// if the connection drops before it is written.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No connection to the relay is currently established.
    #[error("not connected to relay")]
    NotConnected,

    /// The outbound queue is full.
    #[error("outbound queue full, report dropped")]
    Backpressure,

    /// The link task has stopped.
    #[error("relay link closed")]
    Closed,

    /// The link was spawned receive-only.
    #[error("link is receive-only")]
    ReceiveOnly,

    /// The report could not be encoded as a frame.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that can occur when loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    /// An environment variable held an unusable value.
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
