//! The reading session aggregate.
//!
//! All methods are synchronous. Async work is bracketed by a `begin_*`
//! method that hands out a ticket carrying the current epoch, and a
//! `complete_*` method that applies the result only if the epoch still
//! matches.

use std::fmt;

use augur_core::deck::DrawnCard;
use augur_core::error::ReadingError;
use augur_core::spread::SpreadDefinition;
use augur_interpretation::domain::document::GeneratedReading;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Where a session is in the reading flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    /// No reading in progress.
    Idle,
    /// Choosing a spread, or recovering from a failed draw.
    Setup,
    /// Spread chosen; waiting for the intention.
    Intention,
    /// Cards are being drawn.
    Drawing,
    /// Cards drawn; the user is turning them over.
    Reveal,
    /// The interpretation is being generated.
    Interpreting,
    /// The interpretation is ready.
    Complete,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Setup => "setup",
            Self::Intention => "intention",
            Self::Drawing => "drawing",
            Self::Reveal => "reveal",
            Self::Interpreting => "interpreting",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Outcome of an async step.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// The result was written into the session.
    Applied(T),
    /// The session was cleared or restarted while the work was in flight.
    Discarded,
}

impl<T> Completion<T> {
    /// True if the result was discarded.
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded)
    }
}

/// Issued by [`ReadingSession::begin_draw`].
#[derive(Debug, Clone)]
pub struct DrawTicket {
    /// Epoch the draw started under.
    pub epoch: u64,
    /// Spread to draw for.
    pub spread: SpreadDefinition,
}

/// Issued by [`ReadingSession::begin_interpretation`].
#[derive(Debug, Clone)]
pub struct InterpretationTicket {
    /// Epoch the generation started under.
    pub epoch: u64,
    /// The stated intention.
    pub intention: String,
    /// Drawn cards in position order.
    pub cards: Vec<DrawnCard>,
}

/// Data handed to the repository on save.
#[derive(Debug, Clone)]
pub struct FinishedSession {
    /// The stated intention.
    pub intention: String,
    /// The spread used.
    pub spread: SpreadDefinition,
    /// Drawn cards in position order.
    pub cards: Vec<DrawnCard>,
    /// The generated reading.
    pub reading: GeneratedReading,
}

/// Read-only view of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    /// Session handle.
    pub id: Uuid,
    /// Current step.
    pub step: SessionStep,
    /// When the current reading started.
    pub started_at: DateTime<Utc>,
    /// Chosen spread.
    pub spread: Option<SpreadDefinition>,
    /// Stated intention.
    pub intention: Option<String>,
    /// Drawn cards; a card is present only once its position is revealed.
    pub cards: Vec<Option<DrawnCard>>,
    /// The interpretation, once complete.
    pub interpretation: Option<GeneratedReading>,
    /// Message from the last failed draw.
    pub last_error: Option<String>,
}

/// One in-progress reading.
#[derive(Debug, Clone)]
pub struct ReadingSession {
    /// Session handle.
    pub id: Uuid,
    started_at: DateTime<Utc>,
    step: SessionStep,
    spread: Option<SpreadDefinition>,
    intention: Option<String>,
    drawn_cards: Vec<DrawnCard>,
    revealed: Vec<bool>,
    interpretation: Option<GeneratedReading>,
    last_error: Option<String>,
    epoch: u64,
}

impl ReadingSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new(id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            step: SessionStep::Idle,
            spread: None,
            intention: None,
            drawn_cards: Vec::new(),
            revealed: Vec::new(),
            interpretation: None,
            last_error: None,
            epoch: 0,
        }
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> SessionStep {
        self.step
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Discards everything and returns to `Idle`. Valid from any step.
    pub fn reset(&mut self) {
        self.step = SessionStep::Idle;
        self.spread = None;
        self.intention = None;
        self.drawn_cards.clear();
        self.revealed.clear();
        self.interpretation = None;
        self.last_error = None;
        self.epoch += 1;
    }

    /// Chooses a spread. From `Idle` this starts a new reading.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` once cards are being drawn.
    pub fn select_spread(
        &mut self,
        spread: SpreadDefinition,
        now: DateTime<Utc>,
    ) -> Result<(), ReadingError> {
        match self.step {
            SessionStep::Idle => {
                self.epoch += 1;
                self.started_at = now;
                self.intention = None;
            }
            SessionStep::Setup | SessionStep::Intention => {}
            _ => return Err(self.invalid("select a spread")),
        }
        self.spread = Some(spread);
        self.last_error = None;
        self.step = SessionStep::Intention;
        Ok(())
    }

    /// Records the intention.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::Validation` for a blank intention and
    /// `ReadingError::InvalidTransition` outside `Intention` and `Setup`.
    pub fn set_intention(&mut self, text: &str) -> Result<(), ReadingError> {
        if !matches!(self.step, SessionStep::Intention | SessionStep::Setup) || self.spread.is_none()
        {
            return Err(self.invalid("set the intention"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ReadingError::Validation("intention must not be blank".to_owned()));
        }
        self.intention = Some(text.to_owned());
        Ok(())
    }

    /// Moves to `Drawing`.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` unless a spread and an
    /// intention are set and no draw has happened yet.
    pub fn begin_draw(&mut self) -> Result<DrawTicket, ReadingError> {
        let ready = matches!(self.step, SessionStep::Intention | SessionStep::Setup)
            && self.intention.is_some();
        let spread = match (&self.spread, ready) {
            (Some(spread), true) => spread.clone(),
            _ => return Err(self.invalid("draw cards")),
        };
        self.step = SessionStep::Drawing;
        self.last_error = None;
        Ok(DrawTicket {
            epoch: self.epoch,
            spread,
        })
    }

    /// Applies a draw result. A failed draw returns the session to `Setup`
    /// with the spread and intention kept, so the draw can be retried.
    ///
    /// # Errors
    ///
    /// Returns the draw error when it is applied.
    pub fn complete_draw(
        &mut self,
        epoch: u64,
        result: Result<Vec<DrawnCard>, ReadingError>,
    ) -> Result<Completion<Vec<DrawnCard>>, ReadingError> {
        if epoch != self.epoch || self.step != SessionStep::Drawing {
            return Ok(Completion::Discarded);
        }
        match result {
            Ok(cards) => {
                self.revealed = vec![false; cards.len()];
                self.drawn_cards.clone_from(&cards);
                self.step = SessionStep::Reveal;
                Ok(Completion::Applied(cards))
            }
            Err(e) => {
                self.step = SessionStep::Setup;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Turns over the card at `index`. Returns true once every card is revealed.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` outside `Reveal` and
    /// `ReadingError::Validation` for an out-of-range index.
    pub fn reveal(&mut self, index: usize) -> Result<bool, ReadingError> {
        if self.step != SessionStep::Reveal {
            return Err(self.invalid("reveal a card"));
        }
        let count = self.revealed.len();
        let slot = self.revealed.get_mut(index).ok_or_else(|| {
            ReadingError::Validation(format!("position {index} out of range for {count} cards"))
        })?;
        *slot = true;
        Ok(self.all_revealed())
    }

    /// True when every drawn card has been revealed.
    #[must_use]
    pub fn all_revealed(&self) -> bool {
        !self.revealed.is_empty() && self.revealed.iter().all(|&r| r)
    }

    /// Moves to `Interpreting`.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` unless every card is revealed.
    pub fn begin_interpretation(&mut self) -> Result<InterpretationTicket, ReadingError> {
        if self.step != SessionStep::Reveal || !self.all_revealed() {
            return Err(self.invalid("request an interpretation"));
        }
        self.step = SessionStep::Interpreting;
        Ok(InterpretationTicket {
            epoch: self.epoch,
            intention: self.intention.clone().unwrap_or_default(),
            cards: self.drawn_cards.clone(),
        })
    }

    /// Applies a generated reading.
    pub fn complete_interpretation(
        &mut self,
        epoch: u64,
        reading: GeneratedReading,
    ) -> Completion<GeneratedReading> {
        if epoch != self.epoch || self.step != SessionStep::Interpreting {
            return Completion::Discarded;
        }
        self.interpretation = Some(reading.clone());
        self.step = SessionStep::Complete;
        Completion::Applied(reading)
    }

    /// Takes the finished reading out of the session and resets it.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::InvalidTransition` outside `Complete`.
    pub fn finish(&mut self) -> Result<FinishedSession, ReadingError> {
        if self.step != SessionStep::Complete {
            return Err(self.invalid("save"));
        }
        let finished = match (self.spread.take(), self.interpretation.take()) {
            (Some(spread), Some(reading)) => FinishedSession {
                intention: self.intention.take().unwrap_or_default(),
                spread,
                cards: std::mem::take(&mut self.drawn_cards),
                reading,
            },
            _ => return Err(self.invalid("save")),
        };
        self.reset();
        Ok(finished)
    }

    /// Read-only view for display.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            step: self.step,
            started_at: self.started_at,
            spread: self.spread.clone(),
            intention: self.intention.clone(),
            cards: self
                .drawn_cards
                .iter()
                .zip(&self.revealed)
                .map(|(card, &shown)| shown.then(|| card.clone()))
                .collect(),
            interpretation: self.interpretation.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> ReadingError {
        ReadingError::InvalidTransition {
            step: self.step.to_string(),
            action,
        }
    }
}
