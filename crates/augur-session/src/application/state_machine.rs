//! Session driver.
//!
//! The `Mutex` around the session is locked only for synchronous aggregate
//! calls and never across an await point. Work started under one epoch is
//! discarded if the session was cleared or restarted before it finished.

use std::sync::{Arc, Mutex, MutexGuard};

use augur_core::clock::Clock;
use augur_core::deck::DrawnCard;
use augur_core::entropy::EntropySource;
use augur_core::error::ReadingError;
use augur_core::spread::SpreadDefinition;
use augur_drawing::application::card_drawer::CardDrawer;
use augur_interpretation::application::orchestrator::GenerationOrchestrator;
use augur_interpretation::domain::document::GeneratedReading;
use augur_interpretation::domain::prompt::GenerationContext;
use augur_library::repository::{CompletedReading, PersistedReading, ReadingRepository};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Completion, ReadingSession, SessionView};

/// Shared collaborators of every session.
#[derive(Clone)]
pub struct SessionServices {
    /// Draws cards from the deck.
    pub drawer: CardDrawer,
    /// Entropy for the drawer.
    pub entropy: Arc<dyn EntropySource>,
    /// Produces interpretations.
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// Persists finished readings.
    pub repository: Arc<ReadingRepository>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServices")
            .field("drawer", &self.drawer)
            .field("orchestrator", &self.orchestrator)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

/// Drives one user's reading session.
#[derive(Debug)]
pub struct SessionStateMachine {
    user_id: String,
    context: GenerationContext,
    services: SessionServices,
    session: Mutex<ReadingSession>,
}

impl SessionStateMachine {
    /// Creates an idle session for `user_id`.
    #[must_use]
    pub fn new(user_id: String, context: GenerationContext, services: SessionServices) -> Self {
        let session = ReadingSession::new(Uuid::new_v4(), services.clock.now());
        Self {
            user_id,
            context,
            services,
            session: Mutex::new(session),
        }
    }

    /// Session handle.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Infrastructure` if the session lock is poisoned.
    pub fn id(&self) -> Result<Uuid, ReadingError> {
        Ok(self.lock()?.id)
    }

    /// Owning user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Chooses a spread, starting a new reading if idle.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` once drawing has begun.
    #[instrument(skip_all, fields(spread_id = %spread.id))]
    pub fn start_session(&self, spread: SpreadDefinition) -> Result<(), ReadingError> {
        let now = self.services.clock.now();
        self.with_session(|s| s.select_spread(spread, now))
    }

    /// Records the intention.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Validation` for a blank intention and
    /// `ReadingError::InvalidTransition` before a spread is chosen or after drawing.
    pub fn set_intention(&self, text: &str) -> Result<(), ReadingError> {
        self.with_session(|s| s.set_intention(text))
    }

    /// Draws cards for the chosen spread.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::DeckUnavailable` or `ReadingError::EntropyUnavailable`
    /// when the draw fails; the session is then back in `Setup` and can retry.
    /// Returns `ReadingError::InvalidTransition` if no intention is set.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn draw_cards(&self) -> Result<Completion<Vec<DrawnCard>>, ReadingError> {
        let ticket = self.with_session(ReadingSession::begin_draw)?;

        let result = self
            .services
            .drawer
            .draw(&ticket.spread, self.services.entropy.as_ref())
            .await;

        let outcome = self.with_session(|s| s.complete_draw(ticket.epoch, result));
        match &outcome {
            Ok(Completion::Discarded) => {
                warn!(epoch = ticket.epoch, "session changed during draw; result discarded");
            }
            Ok(Completion::Applied(cards)) => info!(cards = cards.len(), "cards drawn"),
            Err(e) => warn!(error = %e, "draw failed; session returned to setup"),
        }
        outcome
    }

    /// Reveals the card at `position_index`. Returns true once every card is revealed.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` outside the reveal step and
    /// `ReadingError::Validation` for an out-of-range index.
    pub fn mark_revealed(&self, position_index: usize) -> Result<bool, ReadingError> {
        self.with_session(|s| s.reveal(position_index))
    }

    /// Generates the interpretation. Generation failures never surface: the
    /// orchestrator falls back to a template reading.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` unless every card is revealed.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn request_interpretation(
        &self,
    ) -> Result<Completion<GeneratedReading>, ReadingError> {
        let ticket = self.with_session(ReadingSession::begin_interpretation)?;

        let reading = self
            .services
            .orchestrator
            .generate(&ticket.intention, &ticket.cards, &self.context)
            .await;

        let outcome = self.with_session(|s| Ok(s.complete_interpretation(ticket.epoch, reading)))?;
        if outcome.is_discarded() {
            warn!(epoch = ticket.epoch, "session changed during generation; result discarded");
        }
        Ok(outcome)
    }

    /// Persists the finished reading and resets the session to idle.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` unless the reading is complete.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn save(&self) -> Result<PersistedReading, ReadingError> {
        let finished = self.with_session(ReadingSession::finish)?;
        let reading = CompletedReading {
            user_id: self.user_id.clone(),
            intention: finished.intention,
            spread: finished.spread,
            cards: finished.cards,
            reading: finished.reading,
        };
        Ok(self.services.repository.save(reading).await)
    }

    /// Discards the reading in progress. Valid from any step; work still in
    /// flight completes against the old epoch and is dropped.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Infrastructure` if the session lock is poisoned.
    pub fn clear(&self) -> Result<(), ReadingError> {
        self.with_session(|s| {
            s.reset();
            Ok(())
        })
    }

    /// Read-only view of the session.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Infrastructure` if the session lock is poisoned.
    pub fn snapshot(&self) -> Result<SessionView, ReadingError> {
        Ok(self.lock()?.view())
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut ReadingSession) -> Result<T, ReadingError>,
    ) -> Result<T, ReadingError> {
        let mut guard = self.lock()?;
        let result = f(&mut guard);
        if let Err(e @ ReadingError::InvalidTransition { .. }) = &result {
            error!(error = %e, "rejected session operation");
        }
        result
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReadingSession>, ReadingError> {
        self.session
            .lock()
            .map_err(|e| ReadingError::Infrastructure(format!("session mutex poisoned: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use augur_core::error::ReadingError;
    use augur_core::generation::{GenerationRequest, TextGenerator};
    use augur_core::spread::SpreadCatalog;
    use augur_interpretation::application::orchestrator::OrchestratorConfig;
    use augur_interpretation::domain::document::{Interpretation, ReadingSource};
    use augur_interpretation::domain::fallback::fallback_reading;
    use augur_library::memory_store::InMemoryReadingStore;
    use augur_test_support::{
        FailingEntropy, FailingGenerator, FixedClock, SequenceEntropy, sample_deck, sample_spread,
    };

    use super::*;
    use crate::domain::aggregates::SessionStep;

    struct SlowEntropy;

    #[async_trait]
    impl EntropySource for SlowEntropy {
        async fn request(&self, count: usize) -> Result<Vec<u32>, ReadingError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok((0..count).map(|i| u32::try_from(i).unwrap_or(0)).collect())
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn submit(&self, _request: GenerationRequest) -> Result<String, ReadingError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(ReadingError::GenerationUnavailable("still warming up".into()))
        }
    }

    fn services(entropy: Arc<dyn EntropySource>) -> (SessionServices, Arc<InMemoryReadingStore>) {
        services_with(entropy, Arc::new(FailingGenerator::default()))
    }

    fn services_with(
        entropy: Arc<dyn EntropySource>,
        generator: Arc<dyn TextGenerator>,
    ) -> (SessionServices, Arc<InMemoryReadingStore>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(2026, 1, 15, 10, 0, 0));
        let deck = Arc::new(sample_deck(22));
        let store = Arc::new(InMemoryReadingStore::new());
        let repository = ReadingRepository::new(
            store.clone(),
            Some(deck.clone()),
            Arc::new(SpreadCatalog::new(vec![sample_spread(3)]).unwrap()),
            clock.clone(),
        );
        let orchestrator = GenerationOrchestrator::new(generator, OrchestratorConfig::default());
        let services = SessionServices {
            drawer: CardDrawer::new(deck),
            entropy,
            orchestrator: Arc::new(orchestrator),
            repository: Arc::new(repository),
            clock,
        };
        (services, store)
    }

    fn machine(entropy: Arc<dyn EntropySource>) -> (Arc<SessionStateMachine>, Arc<InMemoryReadingStore>) {
        let (services, store) = services(entropy);
        let machine =
            SessionStateMachine::new("user-1".to_owned(), GenerationContext::default(), services);
        (Arc::new(machine), store)
    }

    async fn revealed_machine(generator: Arc<dyn TextGenerator>) -> Arc<SessionStateMachine> {
        let (services, _) = services_with(
            Arc::new(SequenceEntropy::new(vec![0, 0, 1, 0, 2, 0])),
            generator,
        );
        let machine = Arc::new(SessionStateMachine::new(
            "user-1".to_owned(),
            GenerationContext::default(),
            services,
        ));
        machine.start_session(sample_spread(3)).unwrap();
        machine.set_intention("q").unwrap();
        machine.draw_cards().await.unwrap();
        for i in 0..3 {
            machine.mark_revealed(i).unwrap();
        }
        machine
    }

    #[tokio::test]
    async fn test_full_reading_is_saved_and_session_reset() {
        // Arrange
        let (machine, store) = machine(Arc::new(SequenceEntropy::new(vec![5, 5, 5, 1, 0, 1])));

        // Act
        machine.start_session(sample_spread(3)).unwrap();
        machine.set_intention("What should I focus on?").unwrap();
        let drawn = machine.draw_cards().await.unwrap();
        for i in 0..3 {
            machine.mark_revealed(i).unwrap();
        }
        let generated = machine.request_interpretation().await.unwrap();
        let saved = machine.save().await.unwrap();

        // Assert
        let Completion::Applied(cards) = drawn else {
            panic!("draw was discarded");
        };
        let Completion::Applied(reading) = generated else {
            panic!("generation was discarded");
        };
        assert_eq!(reading.source, ReadingSource::Static);
        assert_eq!(
            reading.interpretation,
            Interpretation::Legacy {
                text: fallback_reading("What should I focus on?", &cards)
            }
        );
        assert!(!saved.is_local());
        assert_eq!(saved.cards, cards);
        assert_eq!(store.len(), 1);
        assert_eq!(machine.snapshot().unwrap().step, SessionStep::Idle);
    }

    #[tokio::test]
    async fn test_draw_failure_allows_retry_from_setup() {
        let (machine, _) = machine(Arc::new(FailingEntropy::default()));
        machine.start_session(sample_spread(3)).unwrap();
        machine.set_intention("q").unwrap();

        let first = machine.draw_cards().await;
        let view = machine.snapshot().unwrap();
        let second = machine.draw_cards().await;

        assert!(matches!(first, Err(ReadingError::EntropyUnavailable(_))));
        assert_eq!(view.step, SessionStep::Setup);
        assert!(view.last_error.is_some());
        assert!(matches!(second, Err(ReadingError::EntropyUnavailable(_))));
    }

    #[tokio::test]
    async fn test_clear_during_draw_discards_late_result() {
        // Arrange
        let (machine, _) = machine(Arc::new(SlowEntropy));
        machine.start_session(sample_spread(3)).unwrap();
        machine.set_intention("q").unwrap();

        // Act
        let in_flight = tokio::spawn({
            let machine = Arc::clone(&machine);
            async move { machine.draw_cards().await }
        });
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        machine.clear().unwrap();
        machine.start_session(sample_spread(1)).unwrap();
        let outcome = in_flight.await.unwrap().unwrap();

        // Assert
        assert!(outcome.is_discarded());
        let view = machine.snapshot().unwrap();
        assert_eq!(view.step, SessionStep::Intention);
        assert_eq!(view.spread.unwrap().card_count(), 1);
        assert!(view.cards.is_empty());
    }

    #[tokio::test]
    async fn test_clear_during_interpretation_discards_late_reading() {
        // Arrange
        let machine = revealed_machine(Arc::new(SlowGenerator)).await;

        // Act
        let in_flight = tokio::spawn({
            let machine = Arc::clone(&machine);
            async move { machine.request_interpretation().await }
        });
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let interpreting = machine.snapshot().unwrap().step;
        machine.clear().unwrap();
        machine.start_session(sample_spread(1)).unwrap();
        let outcome = in_flight.await.unwrap().unwrap();

        // Assert
        assert_eq!(interpreting, SessionStep::Interpreting);
        assert!(outcome.is_discarded());
        let view = machine.snapshot().unwrap();
        assert_eq!(view.step, SessionStep::Intention);
        assert!(view.interpretation.is_none());
        assert!(view.cards.is_empty());
    }

    #[tokio::test]
    async fn test_interpretation_before_reveal_is_rejected() {
        let (machine, _) = machine(Arc::new(SequenceEntropy::new(vec![0, 0, 1, 0, 2, 0])));
        machine.start_session(sample_spread(3)).unwrap();
        machine.set_intention("q").unwrap();
        machine.draw_cards().await.unwrap();
        machine.mark_revealed(0).unwrap();

        let result = machine.request_interpretation().await;

        assert!(matches!(result, Err(ReadingError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_save_outside_complete_is_rejected() {
        let (machine, store) = machine(Arc::new(FailingEntropy::default()));

        let result = machine.save().await;

        assert!(matches!(result, Err(ReadingError::InvalidTransition { .. })));
        assert!(store.is_empty());
    }
}
