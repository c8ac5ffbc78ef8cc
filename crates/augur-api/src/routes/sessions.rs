//! Routes driving reading sessions.

use std::sync::Arc;

use augur_core::error::ReadingError;
use augur_interpretation::domain::prompt::{
    DetailMode, GenerationContext, PersonalizationContext, StyleMode,
};
use augur_library::repository::PersistedReading;
use augur_session::application::state_machine::SessionStateMachine;
use augur_session::domain::aggregates::SessionView;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Owner of readings saved from this session.
    pub user_id: String,
    /// Optional personalization for prompts.
    #[serde(default)]
    pub personalization: PersonalizationContext,
    /// Voice of the reading.
    #[serde(default)]
    pub style: StyleMode,
    /// Length of the reading.
    #[serde(default)]
    pub detail: DetailMode,
}

/// Request body for POST /{id}/start.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Spread to use.
    pub spread_id: String,
}

/// Request body for POST /{id}/intention.
#[derive(Debug, Deserialize)]
pub struct IntentionRequest {
    /// The question or focus of the reading.
    pub intention: String,
}

/// Request body for POST /{id}/reveal.
#[derive(Debug, Deserialize)]
pub struct RevealRequest {
    /// Zero-based position to reveal.
    pub position_index: usize,
}

/// POST /
#[instrument(skip_all, fields(user_id = %request.user_id))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ReadingError::Validation("user_id must not be blank".to_owned()).into());
    }
    let context = GenerationContext {
        personalization: request.personalization,
        style: request.style,
        detail: request.detail,
    };
    let machine = Arc::new(SessionStateMachine::new(
        user_id.to_owned(),
        context,
        state.services.clone(),
    ));
    let id = state.insert_session(Arc::clone(&machine))?;
    info!(session_id = %id, "session created");
    Ok((StatusCode::CREATED, Json(machine.snapshot()?)))
}

/// GET /{id}
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.session(id)?.snapshot()?))
}

/// POST /{id}/start
#[instrument(skip(state, request), fields(spread_id = %request.spread_id))]
async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StartRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    let spread = state.spreads.find(&request.spread_id).ok_or_else(|| {
        ReadingError::Validation(format!("unknown spread id: {}", request.spread_id))
    })?;
    machine.start_session(spread.clone())?;
    Ok(Json(machine.snapshot()?))
}

/// POST /{id}/intention
async fn set_intention(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<IntentionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    machine.set_intention(&request.intention)?;
    Ok(Json(machine.snapshot()?))
}

/// POST /{id}/draw
#[instrument(skip(state))]
async fn draw(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    machine.draw_cards().await?;
    Ok(Json(machine.snapshot()?))
}

/// POST /{id}/reveal
async fn reveal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RevealRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    machine.mark_revealed(request.position_index)?;
    Ok(Json(machine.snapshot()?))
}

/// POST /{id}/interpret
#[instrument(skip(state))]
async fn interpret(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    machine.request_interpretation().await?;
    Ok(Json(machine.snapshot()?))
}

/// POST /{id}/save
#[instrument(skip(state))]
async fn save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PersistedReading>, ApiError> {
    let machine = state.session(id)?;
    let saved = machine.save().await?;
    info!(reading_id = %saved.id, local = saved.is_local(), "reading saved");
    Ok(Json(saved))
}

/// POST /{id}/clear
async fn clear(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let machine = state.session(id)?;
    machine.clear()?;
    Ok(Json(machine.snapshot()?))
}

/// DELETE /{id}
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.remove_session(id)?;
    info!(session_id = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for reading sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/start", post(start))
        .route("/{id}/intention", post(set_intention))
        .route("/{id}/draw", post(draw))
        .route("/{id}/reveal", post(reveal))
        .route("/{id}/interpret", post(interpret))
        .route("/{id}/save", post(save))
        .route("/{id}/clear", post(clear))
}
