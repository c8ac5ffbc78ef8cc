//! Offline template readings.
//!
//! Built only from the static card meanings and the stated intention. No
//! I/O and no parsing, so these functions cannot fail.

use std::fmt::Write;

use augur_core::deck::{DrawnCard, Orientation};

use super::document::{CardInsight, insight_for};

/// A complete plain-text reading for `cards`.
#[must_use]
pub fn fallback_reading(intention: &str, cards: &[DrawnCard]) -> String {
    let mut text = String::new();
    let intention = intention.trim();
    if intention.is_empty() {
        text.push_str("Your reading\n\n");
    } else {
        let _ = writeln!(text, "Your reading for \"{intention}\"\n");
    }

    if cards.is_empty() {
        text.push_str("No cards were drawn for this reading.\n");
        return text;
    }

    for card in cards {
        let _ = writeln!(
            text,
            "{}: {} ({})",
            card.position, card.card.name, card.orientation
        );
        let _ = writeln!(text, "{}\n", card_passage(card));
    }

    let reversed = cards
        .iter()
        .filter(|c| c.orientation == Orientation::Reversed)
        .count();
    text.push_str(closing_for(reversed, cards.len()));
    text.push('\n');
    text
}

/// A per-card insight used when that card's generated section is unusable.
#[must_use]
pub fn fallback_card_insight(card: &DrawnCard) -> CardInsight {
    insight_for(card, card_passage(card))
}

fn card_passage(card: &DrawnCard) -> String {
    let mut passage = String::new();
    if card.position_meaning.trim().is_empty() {
        let _ = write!(passage, "{} speaks of {}.", card.card.name, card.meaning());
    } else {
        let _ = write!(
            passage,
            "In the place of {}, {} speaks of {}.",
            card.position_meaning.trim(),
            card.card.name,
            card.meaning()
        );
    }
    if !card.card.keywords.is_empty() {
        let _ = write!(passage, " Hold onto: {}.", card.card.keywords.join(", "));
    }
    passage
}

fn closing_for(reversed: usize, total: usize) -> &'static str {
    if reversed == 0 {
        "Taken together, the cards flow openly. Trust what is already moving in your favour."
    } else if reversed * 2 > total {
        "Taken together, many cards are reversed. Something is asking to be looked at \
         before you move forward; go slowly and be honest with yourself."
    } else {
        "Taken together, the cards show both ease and resistance. Notice where energy \
         flows freely and where it is held back."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_test_support::sample_drawn_cards;

    #[test]
    fn test_fallback_reading_mentions_intention_and_every_card() {
        let cards = sample_drawn_cards(3);

        let text = fallback_reading("  Should I change jobs?  ", &cards);

        assert!(text.starts_with("Your reading for \"Should I change jobs?\""));
        for card in &cards {
            assert!(text.contains(&card.card.name));
            assert!(text.contains(card.meaning()));
            assert!(text.contains(&card.position));
        }
    }

    #[test]
    fn test_fallback_reading_is_deterministic() {
        let cards = sample_drawn_cards(5);
        assert_eq!(
            fallback_reading("Same", &cards),
            fallback_reading("Same", &cards)
        );
    }

    #[test]
    fn test_fallback_reading_handles_no_intention_and_no_cards() {
        let text = fallback_reading("", &[]);
        assert!(text.starts_with("Your reading\n"));
        assert!(text.contains("No cards were drawn"));
    }

    #[test]
    fn test_fallback_card_insight_uses_orientation_meaning() {
        let cards = sample_drawn_cards(2);

        let insight = fallback_card_insight(&cards[1]);

        assert_eq!(insight.position, "Position 2");
        assert_eq!(insight.orientation, Orientation::Reversed);
        assert!(insight.insight.contains("reversed meaning of card 1"));
    }
}
