//! Generative text service boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ReadingError;

/// A single request to the generative text service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: String,
    /// Upper bound on the response length, in model tokens.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Opaque request/response boundary to the generative text service.
///
/// Implementations must tolerate concurrent calls; no ordering or session
/// affinity is implied between them.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Submits a prompt and returns the raw response text.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::GenerationUnavailable` on transport failure and
    /// `ReadingError::GenerationTimeout` when the deadline is exceeded.
    async fn submit(&self, request: GenerationRequest) -> Result<String, ReadingError>;
}

#[async_trait]
impl TextGenerator for Arc<dyn TextGenerator> {
    async fn submit(&self, request: GenerationRequest) -> Result<String, ReadingError> {
        (**self).submit(request).await
    }
}
