//! Augur API: HTTP surface for the reading pipeline.
//!
//! Exposed as a library so integration tests can build the router without
//! binding a socket.

pub mod config;
pub mod entropy;
pub mod error;
pub mod generator;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/spreads", routes::spreads::router())
        .nest("/api/v1/sessions", routes::sessions::router())
        .nest("/api/v1/readings", routes::readings::router())
        .with_state(state)
}
