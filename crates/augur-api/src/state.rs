//! Shared application state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use augur_core::clock::{Clock, SystemClock};
use augur_core::deck::Deck;
use augur_core::entropy::{EntropySource, ThreadEntropy};
use augur_core::error::ReadingError;
use augur_core::generation::TextGenerator;
use augur_core::spread::SpreadCatalog;
use augur_core::store::ReadingStore;
use augur_drawing::application::card_drawer::CardDrawer;
use augur_interpretation::application::orchestrator::{
    GenerationOrchestrator, OrchestratorConfig,
};
use augur_library::memory_store::InMemoryReadingStore;
use augur_library::pg_store::PgReadingStore;
use augur_library::repository::ReadingRepository;
use augur_session::application::state_machine::{SessionServices, SessionStateMachine};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entropy::HttpEntropySource;
use crate::error::AppError;
use crate::generator::ClaudeTextGenerator;

const BUNDLED_DECK: &str = include_str!("../data/major_arcana.yaml");
const BUNDLED_SPREADS: &str = include_str!("../data/spreads.yaml");

/// Sessions untouched for this long are dropped from the registry.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct SessionEntry {
    machine: Arc<SessionStateMachine>,
    last_touched: DateTime<Utc>,
}

type SessionMap = HashMap<Uuid, SessionEntry>;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Collaborators handed to every new session.
    pub services: SessionServices,
    /// Known spreads.
    pub spreads: Arc<SpreadCatalog>,
    sessions: Arc<Mutex<SessionMap>>,
    session_idle_timeout: TimeDelta,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(services: SessionServices, spreads: Arc<SpreadCatalog>) -> Self {
        Self {
            services,
            spreads,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_idle_timeout: idle_delta(DEFAULT_SESSION_IDLE_TIMEOUT),
        }
    }

    /// Sets how long a session may sit untouched before it is evicted.
    #[must_use]
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = idle_delta(timeout);
        self
    }

    /// Wires every collaborator from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the spread catalog is invalid, the database is
    /// unreachable, or an HTTP client cannot be built.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let deck = load_deck(config.deck_path.as_deref()).map(Arc::new);
        let spreads = Arc::new(load_spreads(config.spreads_path.as_deref())?);

        let store: Arc<dyn ReadingStore> = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await?;
                let store = PgReadingStore::new(pool);
                store.ensure_schema().await?;
                info!("using PostgreSQL reading store");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; readings are kept in memory only");
                Arc::new(InMemoryReadingStore::new())
            }
        };

        let entropy: Arc<dyn EntropySource> = match &config.entropy_url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(config.generation.timeout)
                    .build()
                    .map_err(|e| AppError::Config(format!("entropy client: {e}")))?;
                Arc::new(HttpEntropySource::new(client, url.clone()))
            }
            None => Arc::new(ThreadEntropy),
        };

        if config.generation.api_key.is_none() {
            warn!("GENERATION_API_KEY not set; every reading will use the offline template");
        }
        let generator: Arc<dyn TextGenerator> =
            Arc::new(ClaudeTextGenerator::new(&config.generation)?);
        let orchestrator = GenerationOrchestrator::new(
            generator,
            OrchestratorConfig {
                format: config.interpretation_format,
                ..OrchestratorConfig::default()
            },
        );

        let drawer = match &deck {
            Some(deck) => CardDrawer::new(Arc::clone(deck)),
            None => CardDrawer::unconfigured(),
        };
        let repository = ReadingRepository::new(store, deck, Arc::clone(&spreads), Arc::clone(&clock));

        let services = SessionServices {
            drawer,
            entropy,
            orchestrator: Arc::new(orchestrator),
            repository: Arc::new(repository),
            clock,
        };
        Ok(Self::new(services, spreads).with_session_idle_timeout(config.session_idle_timeout))
    }

    /// Registers a new session, first evicting sessions idle past the timeout.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Infrastructure` if the session registry lock is poisoned.
    pub fn insert_session(&self, session: Arc<SessionStateMachine>) -> Result<Uuid, ReadingError> {
        let id = session.id()?;
        let now = self.services.clock.now();
        let mut sessions = self.lock_sessions()?;

        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_touched < self.session_idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "idle sessions evicted");
        }

        sessions.insert(
            id,
            SessionEntry {
                machine: session,
                last_touched: now,
            },
        );
        Ok(id)
    }

    /// Looks up a live session and marks it as touched.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::SessionNotFound` for an unknown or evicted id.
    pub fn session(&self, id: Uuid) -> Result<Arc<SessionStateMachine>, ReadingError> {
        let now = self.services.clock.now();
        let mut sessions = self.lock_sessions()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or(ReadingError::SessionNotFound(id))?;
        entry.last_touched = now;
        Ok(Arc::clone(&entry.machine))
    }

    /// Drops a session from the registry. Work still in flight on it completes
    /// but can no longer be observed.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::SessionNotFound` for an unknown id.
    pub fn remove_session(&self, id: Uuid) -> Result<(), ReadingError> {
        self.lock_sessions()?
            .remove(&id)
            .map(|_| ())
            .ok_or(ReadingError::SessionNotFound(id))
    }

    /// Number of live sessions.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Infrastructure` if the session registry lock is poisoned.
    pub fn session_count(&self) -> Result<usize, ReadingError> {
        Ok(self.lock_sessions()?.len())
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionMap>, ReadingError> {
        self.sessions
            .lock()
            .map_err(|e| ReadingError::Infrastructure(format!("session registry poisoned: {e}")))
    }
}

fn idle_delta(timeout: Duration) -> TimeDelta {
    TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX)
}

/// Loads the deck from `path`, or the bundled deck. A deck that fails to
/// load leaves drawing unconfigured rather than stopping the server.
#[must_use]
pub fn load_deck(path: Option<&Path>) -> Option<Deck> {
    let source = match path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "deck file unreadable; drawing disabled");
                return None;
            }
        },
        None => BUNDLED_DECK.to_owned(),
    };
    Deck::from_yaml(&source)
        .inspect(|deck| info!(cards = deck.len(), "deck loaded"))
        .inspect_err(|e| warn!(error = %e, "deck invalid; drawing disabled"))
        .ok()
}

/// Loads the spread catalog from `path`, or the bundled catalog.
///
/// # Errors
///
/// Returns `AppError::Config` if the file cannot be read or parsed.
pub fn load_spreads(path: Option<&Path>) -> Result<SpreadCatalog, AppError> {
    let source = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?,
        None => BUNDLED_SPREADS.to_owned(),
    };
    SpreadCatalog::from_yaml(&source).map_err(|e| AppError::Config(e.to_string()))
}
