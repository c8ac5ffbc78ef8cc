//! Augur API error types.

use augur_core::error::ReadingError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable or reference data file is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// The tracing stack could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `ReadingError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub ReadingError);

impl From<ReadingError> for ApiError {
    fn from(err: ReadingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            ReadingError::DeckUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "deck_unavailable"),
            ReadingError::EntropyUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "entropy_unavailable")
            }
            ReadingError::GenerationUnavailable(_) | ReadingError::GenerationTimeout(_) => {
                (StatusCode::BAD_GATEWAY, "generation_unavailable")
            }
            ReadingError::ValidationFailed(_) => (StatusCode::BAD_GATEWAY, "validation_failed"),
            ReadingError::PersistenceFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_failed")
            }
            ReadingError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            ReadingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ReadingError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            ReadingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn status_of(err: ReadingError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        assert_eq!(
            status_of(ReadingError::SessionNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_transition_maps_to_409() {
        assert_eq!(
            status_of(ReadingError::InvalidTransition {
                step: "idle".to_owned(),
                action: "draw cards",
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_draw_failures_map_to_503() {
        assert_eq!(
            status_of(ReadingError::DeckUnavailable("none".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ReadingError::EntropyUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_generation_failures_map_to_502() {
        assert_eq!(
            status_of(ReadingError::GenerationTimeout("slow".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ReadingError::ValidationFailed("short".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(ReadingError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_persistence_maps_to_500() {
        assert_eq!(
            status_of(ReadingError::PersistenceFailed("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_reported_as_internal_error() {
        let response =
            ApiError(ReadingError::Infrastructure("session mutex poisoned".into())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal_error");
    }
}
