//! Routes for saved readings.

use augur_core::error::ReadingError;
use augur_library::repository::PersistedReading;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// Query for GET /.
#[derive(Debug, Deserialize)]
pub struct ListReadingsQuery {
    /// Whose readings to list.
    pub user_id: String,
    /// Maximum number of readings, newest first.
    pub limit: Option<usize>,
}

/// Query for DELETE /{id}.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// Owner of the reading.
    pub user_id: String,
}

fn require_user(user_id: &str) -> Result<&str, ReadingError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ReadingError::Validation("user_id must not be blank".to_owned()));
    }
    Ok(user_id)
}

/// GET /
#[instrument(skip(state))]
async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ListReadingsQuery>,
) -> Result<Json<Vec<PersistedReading>>, ApiError> {
    let user_id = require_user(&query.user_id)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ReadingError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        ))
        .into());
    }
    let readings = state.services.repository.load(user_id, limit).await?;
    Ok(Json(readings))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_reading(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    let user_id = require_user(&query.user_id)?;
    state.services.repository.delete(&id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for saved readings.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_readings))
        .route("/{id}", delete(delete_reading))
}
