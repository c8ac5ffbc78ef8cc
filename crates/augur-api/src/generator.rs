//! Generative text service client for the Anthropic Messages API.

use async_trait::async_trait;
use augur_core::error::ReadingError;
use augur_core::generation::{GenerationRequest, TextGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::GenerationConfig;
use crate::error::AppError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// `TextGenerator` backed by Claude.
#[derive(Clone)]
pub struct ClaudeTextGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    url: String,
}

impl std::fmt::Debug for ClaudeTextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeTextGenerator")
            .field("model", &self.model)
            .field("url", &self.url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ClaudeTextGenerator {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("generation client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            url: config.url.clone(),
        })
    }
}

fn transport_error(e: &reqwest::Error) -> ReadingError {
    if e.is_timeout() {
        ReadingError::GenerationTimeout(e.to_string())
    } else {
        ReadingError::GenerationUnavailable(e.to_string())
    }
}

fn extract_text(response: MessagesResponse) -> Result<String, ReadingError> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    if text.is_empty() {
        return Err(ReadingError::GenerationUnavailable(
            "response contained no text".to_owned(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for ClaudeTextGenerator {
    #[instrument(skip_all, fields(model = %self.model, max_tokens = request.max_output_tokens))]
    async fn submit(&self, request: GenerationRequest) -> Result<String, ReadingError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ReadingError::GenerationUnavailable("no API key configured".to_owned())
        })?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ReadingError::GenerationUnavailable(format!(
                "service returned {status}: {detail}"
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| transport_error(&e))?;
        let text = extract_text(parsed)?;
        debug!(chars = text.len(), "generation response received");
        Ok(text)
    }
}
