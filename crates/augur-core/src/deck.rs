//! Deck reference data and drawn cards.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReadingError;

/// A single card with its static meanings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable identity, unique within a deck.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Meaning when drawn upright.
    pub upright: String,
    /// Meaning when drawn reversed.
    pub reversed: String,
    /// Keyword tags.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Ordered, fixed-size collection of cards. Loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a deck, rejecting empty decks and duplicate card ids.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::DeckUnavailable` if the card list is unusable.
    pub fn new(cards: Vec<Card>) -> Result<Self, ReadingError> {
        if cards.is_empty() {
            return Err(ReadingError::DeckUnavailable("deck has no cards".to_owned()));
        }
        let mut seen = HashSet::new();
        for card in &cards {
            if !seen.insert(card.id.as_str()) {
                return Err(ReadingError::DeckUnavailable(format!(
                    "duplicate card id: {}",
                    card.id
                )));
            }
        }
        Ok(Self { cards })
    }

    /// Parses a deck from YAML of the form `cards: [{id, name, upright, reversed, keywords}]`.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::DeckUnavailable` if the document does not parse
    /// or fails the checks in [`Deck::new`].
    pub fn from_yaml(source: &str) -> Result<Self, ReadingError> {
        #[derive(Deserialize)]
        struct DeckFile {
            cards: Vec<Card>,
        }

        let file: DeckFile = serde_yaml::from_str(source)
            .map_err(|e| ReadingError::DeckUnavailable(format!("deck parse failed: {e}")))?;
        Self::new(file.cards)
    }

    /// Number of cards in the deck.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Always false; empty decks are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card at a deck index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    /// Looks up a card by identity.
    #[must_use]
    pub fn find(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// All cards in deck order.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

/// Which way up a card was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Drawn the right way up.
    Upright,
    /// Drawn upside down.
    Reversed,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upright => f.write_str("Upright"),
            Self::Reversed => f.write_str("Reversed"),
        }
    }
}

/// A card bound to one spread position with an orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnCard {
    /// The drawn card.
    pub card: Card,
    /// Name of the spread position it fills.
    pub position: String,
    /// Orientation it was drawn in.
    pub orientation: Orientation,
    /// What the position signifies within the spread.
    pub position_meaning: String,
}

impl DrawnCard {
    /// The static meaning that applies to this card's orientation.
    #[must_use]
    pub fn meaning(&self) -> &str {
        match self.orientation {
            Orientation::Upright => &self.card.upright,
            Orientation::Reversed => &self.card.reversed,
        }
    }
}
