//! Error types for the relay HTTP layer.
//!
//! [`RelayError`] unifies handler failure modes into a single enum that
//! converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bustrack_core::IngestError;

/// Errors that can occur in the relay's REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ingestion endpoint refused a report.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The request body is not a well-formed report.
    #[error("malformed body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Ingest(e @ IngestError::Invalid(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Ingest(e @ IngestError::Stale { .. }) => (StatusCode::CONFLICT, e.to_string()),
            Self::MalformedBody(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
