//! REST endpoint handlers for the relay server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Revision, vehicle and session counts |
//! | `GET` | `/api/locations` | Current fleet snapshot |
//! | `POST` | `/api/locations` | One-shot position report (manual update) |
//! | `GET` | `/api/routes` | Route catalog |
//! | `GET` | `/api/routes/{id}` | Single route |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use bustrack_core::IngestSource;
use bustrack_types::{BusLocation, BusLocationReport, BusRoute};

use crate::error::RelayError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page listing tracked vehicles and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.relay.store.snapshot().await;
    let sessions = state.relay.hub.session_count().await;
    let revision = snapshot.revision;
    let vehicles = snapshot.len();

    let rows: String = snapshot
        .locations
        .iter()
        .map(|loc| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.6}, {:.6}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&loc.bus_id),
                escape(&loc.route_id),
                loc.position.lat,
                loc.position.lng,
                loc.status,
                loc.timestamp.to_rfc3339(),
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Bustrack Relay</title>
    <style>
        body {{ font-family: system-ui, sans-serif; padding: 2rem; max-width: 900px; margin: 0 auto; }}
        h1 {{ color: #4CAF50; margin-bottom: 0.25rem; }}
        .metric {{ display: inline-block; border: 1px solid #ddd; border-radius: 6px;
                   padding: 0.75rem 1.25rem; margin: 0.5rem 0.5rem 0.5rem 0; }}
        .metric .value {{ font-size: 1.5rem; font-weight: bold; }}
        table {{ border-collapse: collapse; width: 100%; margin-top: 1rem; }}
        td, th {{ border-bottom: 1px solid #eee; padding: 0.4rem; text-align: left; }}
    </style>
</head>
<body>
    <h1>Bustrack Relay</h1>
    <div>
        <div class="metric"><div>Revision</div><div class="value">{revision}</div></div>
        <div class="metric"><div>Vehicles</div><div class="value">{vehicles}</div></div>
        <div class="metric"><div>Viewers</div><div class="value">{sessions}</div></div>
    </div>
    <table>
        <tr><th>Bus</th><th>Route</th><th>Position</th><th>Status</th><th>Reported</th></tr>
{rows}    </table>
    <p>
        <a href="/api/locations">/api/locations</a> &middot;
        <a href="/api/routes">/api/routes</a> &middot;
        <a href="/api/status">/api/status</a> &middot;
        WebSocket: <code>/ws</code>, <code>/ws/ingest</code>
    </p>
</body>
</html>"#
    ))
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Report store revision, vehicle count, and connected viewer count.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let revision = state.relay.store.revision().await;
    let vehicles = state.relay.store.len().await;
    let sessions = state.relay.hub.session_count().await;

    Json(serde_json::json!({
        "revision": revision,
        "vehicles": vehicles,
        "sessions": sessions,
        "uptime_seconds": state.uptime_seconds(),
    }))
}

// ---------------------------------------------------------------------------
// /api/locations
// ---------------------------------------------------------------------------

/// Return the current fleet snapshot, the same array viewers receive.
pub async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<BusLocation>> {
    Json(state.relay.store.snapshot().await.locations)
}

/// Accept one position report outside any socket session.
///
/// Takes the same validation and broadcast path as a `busLocation` frame.
/// The body is decoded here rather than by the `Json` extractor so that a
/// mistyped field gets the same `400` error body as a failed validation.
pub async fn post_location(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<BusLocation>), RelayError> {
    let report: BusLocationReport = serde_json::from_slice(&body)?;
    let receipt = state
        .relay
        .ingestor
        .ingest(report, IngestSource::Http)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt.location)))
}

// ---------------------------------------------------------------------------
// /api/routes
// ---------------------------------------------------------------------------

/// List every route in the catalog.
pub async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Vec<BusRoute>> {
    Json(state.catalog.routes.clone())
}

/// Get one route by id.
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BusRoute>, RelayError> {
    state
        .catalog
        .route(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| RelayError::NotFound(format!("route {id} not found")))
}
