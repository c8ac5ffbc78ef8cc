//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the reading pipeline.
///
/// Generation and persistence failures are absorbed inside the orchestrator
/// and repository respectively; they appear here because the boundary traits
/// report them.
#[derive(Debug, Error)]
pub enum ReadingError {
    /// The deck is not loaded, or cannot serve the requested spread.
    #[error("deck unavailable: {0}")]
    DeckUnavailable(String),

    /// The entropy feed failed or returned too few values.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// The generative text service could not be reached or errored.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The generative text service exceeded its deadline.
    #[error("generation timed out: {0}")]
    GenerationTimeout(String),

    /// A generated response failed structural validation.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The persistent store rejected a read or write.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// A session operation was invoked from a step that does not allow it.
    #[error("invalid transition: cannot {action} while in {step}")]
    InvalidTransition {
        /// The step the session was in.
        step: String,
        /// The attempted operation.
        action: &'static str,
    },

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// No live session exists for the given handle.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// In-process state is unusable, such as a poisoned lock.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
