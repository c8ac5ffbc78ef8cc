//! Card assignment by linear probing.
//!
//! The first `card_count` values pick cards, the next `card_count` pick
//! orientations. A pick that collides with an earlier one probes forward
//! (with wraparound) to the next unused deck index, so later positions
//! are more likely to land past earlier picks.

use augur_core::deck::{Deck, DrawnCard, Orientation};
use augur_core::error::ReadingError;
use augur_core::spread::SpreadDefinition;

/// Number of entropy values a draw of `card_count` cards consumes.
#[must_use]
pub fn entropy_needed(card_count: usize) -> usize {
    2 * card_count
}

/// Rejects spreads the deck cannot serve without exhausting the probe.
///
/// # Errors
///
/// Returns `ReadingError::DeckUnavailable` unless `card_count < deck size`.
pub fn check_capacity(deck: &Deck, spread: &SpreadDefinition) -> Result<(), ReadingError> {
    if spread.card_count() >= deck.len() {
        return Err(ReadingError::DeckUnavailable(format!(
            "spread {} needs {} cards but the deck holds {}",
            spread.id,
            spread.card_count(),
            deck.len()
        )));
    }
    Ok(())
}

/// Orientation for a single entropy value.
#[must_use]
pub fn orientation_for(value: u32) -> Orientation {
    if value % 2 == 0 {
        Orientation::Upright
    } else {
        Orientation::Reversed
    }
}

/// Picks deck indices for every position, resolving collisions by probing.
///
/// Callers must have passed [`check_capacity`]; `selection` must hold one
/// value per position.
#[must_use]
pub fn pick_indices(deck_size: usize, selection: &[u32]) -> Vec<usize> {
    let mut used = vec![false; deck_size];
    let mut picks = Vec::with_capacity(selection.len());
    for &value in selection {
        let mut idx = value as usize % deck_size;
        while used[idx] {
            idx = (idx + 1) % deck_size;
        }
        used[idx] = true;
        picks.push(idx);
    }
    picks
}

/// Binds cards to spread positions from a full block of entropy.
///
/// # Errors
///
/// Returns `ReadingError::DeckUnavailable` if the deck is too small for the
/// spread and `ReadingError::EntropyUnavailable` if `values` is short.
pub fn assign(
    deck: &Deck,
    spread: &SpreadDefinition,
    values: &[u32],
) -> Result<Vec<DrawnCard>, ReadingError> {
    check_capacity(deck, spread)?;
    let count = spread.card_count();
    if values.len() < entropy_needed(count) {
        return Err(ReadingError::EntropyUnavailable(format!(
            "expected {} values, received {}",
            entropy_needed(count),
            values.len()
        )));
    }

    let (selection, orientation) = values.split_at(count);
    let picks = pick_indices(deck.len(), selection);

    let drawn = spread
        .positions
        .iter()
        .zip(picks)
        .zip(orientation)
        .filter_map(|((position, idx), &value)| {
            deck.get(idx).map(|card| DrawnCard {
                card: card.clone(),
                position: position.name.clone(),
                orientation: orientation_for(value),
                position_meaning: position.meaning.clone(),
            })
        })
        .collect();
    Ok(drawn)
}
