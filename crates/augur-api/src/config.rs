//! Environment configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;

use augur_interpretation::domain::prompt::OutputFormat;

use crate::error::AppError;

/// Default generative model.
pub const DEFAULT_GENERATION_MODEL: &str = "claude-sonnet-4-20250514";
/// Default generative service endpoint.
pub const DEFAULT_GENERATION_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 60 * 60;

/// Generative text service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// API key; without one every call fails and readings come from the fallback.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Endpoint URL.
    pub url: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// PostgreSQL URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Deck YAML file; `None` selects the bundled deck.
    pub deck_path: Option<PathBuf>,
    /// Spread catalog YAML file; `None` selects the bundled catalog.
    pub spreads_path: Option<PathBuf>,
    /// Generative text service.
    pub generation: GenerationConfig,
    /// External entropy feed; `None` selects the thread RNG.
    pub entropy_url: Option<String>,
    /// Output shape for single-call readings.
    pub interpretation_format: OutputFormat,
    /// OTLP collector endpoint; `None` disables span export.
    pub otlp_endpoint: Option<String>,
    /// How long an untouched session stays in the registry.
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let timeout_secs = match get("GENERATION_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("GENERATION_TIMEOUT_SECS must be a whole number: {e}"))
            })?,
            None => DEFAULT_GENERATION_TIMEOUT_SECS,
        };
        let session_idle_secs = match get("SESSION_IDLE_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("SESSION_IDLE_TIMEOUT_SECS must be a whole number: {e}"))
            })?,
            None => DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
        };
        let interpretation_format = match get("INTERPRETATION_FORMAT").as_deref() {
            None | Some("structured") => OutputFormat::Structured,
            Some("legacy") => OutputFormat::Legacy,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "INTERPRETATION_FORMAT must be structured or legacy, got {other}"
                )));
            }
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            database_url: get("DATABASE_URL"),
            deck_path: get("DECK_PATH").map(PathBuf::from),
            spreads_path: get("SPREADS_PATH").map(PathBuf::from),
            generation: GenerationConfig {
                api_key: get("GENERATION_API_KEY"),
                model: get("GENERATION_MODEL")
                    .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_owned()),
                url: get("GENERATION_URL").unwrap_or_else(|| DEFAULT_GENERATION_URL.to_owned()),
                timeout: Duration::from_secs(timeout_secs),
            },
            entropy_url: get("ENTROPY_URL"),
            interpretation_format,
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            session_idle_timeout: Duration::from_secs(session_idle_secs),
        })
    }
}
