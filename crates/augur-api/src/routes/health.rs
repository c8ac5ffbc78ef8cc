//! Liveness endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of GET /health.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Whether a deck is loaded; without one every draw fails.
    pub deck_loaded: bool,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        deck_loaded: state.services.drawer.deck().is_some(),
    })
}

/// Router serving the liveness endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
