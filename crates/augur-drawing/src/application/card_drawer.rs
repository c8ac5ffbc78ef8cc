//! Card drawer: fetches entropy and binds cards to a spread.

use std::sync::Arc;

use augur_core::deck::{Deck, DrawnCard};
use augur_core::entropy::EntropySource;
use augur_core::error::ReadingError;
use augur_core::spread::SpreadDefinition;
use tracing::{debug, instrument, warn};

use crate::domain::assignment;

/// Draws duplicate-free card sets from a configured deck.
#[derive(Debug, Clone)]
pub struct CardDrawer {
    deck: Option<Arc<Deck>>,
}

impl CardDrawer {
    /// Creates a drawer over a loaded deck.
    #[must_use]
    pub fn new(deck: Arc<Deck>) -> Self {
        Self { deck: Some(deck) }
    }

    /// Creates a drawer with no deck; every draw fails with `DeckUnavailable`.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { deck: None }
    }

    /// The configured deck, if any.
    #[must_use]
    pub fn deck(&self) -> Option<&Arc<Deck>> {
        self.deck.as_ref()
    }

    /// Draws one card per spread position, in position order.
    ///
    /// Deck checks run before any entropy is requested. The draw is
    /// all-or-nothing: a failed entropy request yields no cards.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::DeckUnavailable` if no deck is configured or the
    /// spread needs as many cards as the deck holds, and
    /// `ReadingError::EntropyUnavailable` if the entropy feed fails.
    #[instrument(skip(self, spread, entropy), fields(spread_id = %spread.id))]
    pub async fn draw(
        &self,
        spread: &SpreadDefinition,
        entropy: &dyn EntropySource,
    ) -> Result<Vec<DrawnCard>, ReadingError> {
        let deck = self
            .deck
            .as_deref()
            .ok_or_else(|| ReadingError::DeckUnavailable("no deck configured".to_owned()))?;
        assignment::check_capacity(deck, spread)?;

        let needed = assignment::entropy_needed(spread.card_count());
        let values = entropy.request(needed).await.inspect_err(|e| {
            warn!(error = %e, "entropy request failed");
        })?;

        let drawn = assignment::assign(deck, spread, &values)?;
        debug!(cards = drawn.len(), "cards drawn");
        Ok(drawn)
    }
}
