//! Axum router construction for the relay.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS enabled so browser viewers on other origins can connect.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the relay server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- participant socket (hydrated, subscribed, may report)
/// - `GET /ws/ingest` -- producer-only socket
/// - `GET /api/status` -- revision and counts
/// - `GET /api/locations` -- current fleet
/// - `POST /api/locations` -- one-shot position report
/// - `GET /api/routes` -- route catalog
/// - `GET /api/routes/{id}` -- single route
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_participant))
        .route("/ws/ingest", get(ws::ws_ingest))
        // REST API
        .route("/api/status", get(handlers::status))
        .route(
            "/api/locations",
            get(handlers::list_locations).post(handlers::post_location),
        )
        .route("/api/routes", get(handlers::list_routes))
        .route("/api/routes/{id}", get(handlers::get_route))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
