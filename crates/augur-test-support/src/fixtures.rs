//! Reference-data fixtures.

use augur_core::deck::{Card, Deck, DrawnCard, Orientation};
use augur_core::spread::{Position, SpreadDefinition};

/// A deck of `size` synthetic cards with ids `card-0`, `card-1`, ...
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn sample_deck(size: usize) -> Deck {
    let cards = (0..size)
        .map(|i| Card {
            id: format!("card-{i}"),
            name: format!("Card {i}"),
            upright: format!("upright meaning of card {i}"),
            reversed: format!("reversed meaning of card {i}"),
            keywords: vec![format!("theme-{i}")],
        })
        .collect();
    Deck::new(cards).expect("sample deck must have at least one card")
}

/// A spread named `spread-<count>` with `count` positions `Position 1`, `Position 2`, ...
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_spread(count: usize) -> SpreadDefinition {
    SpreadDefinition {
        id: format!("spread-{count}"),
        name: format!("Spread of {count}"),
        description: String::new(),
        positions: (1..=count)
            .map(|i| Position {
                name: format!("Position {i}"),
                meaning: format!("meaning of position {i}"),
                x: i as f32,
                y: 0.0,
            })
            .collect(),
    }
}

/// `count` drawn cards taken from the front of a sample deck, alternating
/// upright and reversed, bound to the positions of [`sample_spread`].
#[must_use]
pub fn sample_drawn_cards(count: usize) -> Vec<DrawnCard> {
    let deck = sample_deck(count.max(1));
    sample_spread(count)
        .positions
        .into_iter()
        .enumerate()
        .map(|(i, position)| DrawnCard {
            card: deck.cards()[i].clone(),
            position: position.name,
            orientation: if i % 2 == 0 {
                Orientation::Upright
            } else {
                Orientation::Reversed
            },
            position_meaning: position.meaning,
        })
        .collect()
}
