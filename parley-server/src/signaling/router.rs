use crate::signaling::{SignalingService, command_handler, sse_handler, ws_handler};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_core::IceServerConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// All relay routes. Browser clients are served from another origin, so
/// CORS is open.
pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rooms/{room_id}/peers/{peer_id}/events", get(sse_handler))
        .route("/signal", post(command_handler))
        .route("/ws/{room_id}/{peer_id}", get(ws_handler))
        .route("/ice-servers", get(ice_servers))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

async fn ice_servers(State(service): State<SignalingService>) -> Json<Vec<IceServerConfig>> {
    Json(service.ice_servers())
}
