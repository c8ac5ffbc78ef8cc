//! Spread catalog endpoint.

use augur_core::spread::SpreadDefinition;
use axum::extract::State;
use axum::{Json, Router, routing::get};

use crate::state::AppState;

/// GET /
async fn list_spreads(State(state): State<AppState>) -> Json<Vec<SpreadDefinition>> {
    Json(state.spreads.spreads().to_vec())
}

/// Returns the router for the spread catalog.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_spreads))
}
