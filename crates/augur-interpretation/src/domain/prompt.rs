//! Prompt rendering.
//!
//! Pure functions of the intention, the drawn set, and the caller's
//! personalization and style choices. Decomposed prompts are each
//! self-contained: a per-card prompt names its own card in full and the
//! rest of the spread only in passing.

use std::fmt::Write;

use augur_core::deck::DrawnCard;
use augur_core::generation::GenerationRequest;
use serde::{Deserialize, Serialize};

const READING_TEMPERATURE: f32 = 0.8;
const META_TEMPERATURE: f32 = 0.7;

/// Voice of the reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleMode {
    /// Symbolic, evocative language.
    #[default]
    Mystical,
    /// Grounded, actionable language.
    Practical,
    /// Reflective language drawing on psychology.
    Psychological,
}

impl StyleMode {
    fn voice(self) -> &'static str {
        match self {
            Self::Mystical => {
                "Speak in a warm, evocative voice that honours the symbolism of the cards."
            }
            Self::Practical => {
                "Speak plainly and concretely; favour actionable observations over symbolism."
            }
            Self::Psychological => {
                "Frame the cards as mirrors for inner patterns, motives and choices."
            }
        }
    }
}

/// How long the reading should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailMode {
    /// Short reading.
    Concise,
    /// Default length.
    #[default]
    Standard,
    /// Long, detailed reading.
    Deep,
}

impl DetailMode {
    /// Target words for one card insight.
    #[must_use]
    pub fn words_per_card(self) -> u32 {
        match self {
            Self::Concise => 60,
            Self::Standard => 120,
            Self::Deep => 220,
        }
    }

    /// Token budget for one card insight.
    #[must_use]
    pub fn card_tokens(self) -> u32 {
        match self {
            Self::Concise => 300,
            Self::Standard => 600,
            Self::Deep => 1_000,
        }
    }

    /// Token budget for the overview or closing sections.
    #[must_use]
    pub fn section_tokens(self) -> u32 {
        match self {
            Self::Concise => 400,
            Self::Standard => 700,
            Self::Deep => 1_200,
        }
    }
}

/// What the caller knows about the querent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizationContext {
    /// How to address the querent.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Life areas the querent cares about.
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Themes from recent readings.
    #[serde(default)]
    pub recent_themes: Vec<String>,
}

/// Everything besides the cards and intention that shapes a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Who the reading is for.
    #[serde(default)]
    pub personalization: PersonalizationContext,
    /// Voice.
    #[serde(default)]
    pub style: StyleMode,
    /// Length.
    #[serde(default)]
    pub detail: DetailMode,
}

/// Output shape requested from a consolidated prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Version 2 structured JSON.
    #[default]
    Structured,
    /// Plain prose.
    Legacy,
}

/// The fan-out prompt set for a large spread.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedPrompts {
    /// Overview and preview.
    pub overview: GenerationRequest,
    /// One prompt per drawn card, in position order.
    pub cards: Vec<GenerationRequest>,
    /// Synthesis, guidance, timing and closing.
    pub meta: GenerationRequest,
}

/// Renders prompts for one reading.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder<'a> {
    context: &'a GenerationContext,
}

impl<'a> PromptBuilder<'a> {
    /// Creates a builder for the given context.
    #[must_use]
    pub fn new(context: &'a GenerationContext) -> Self {
        Self { context }
    }

    /// A single prompt asking for the whole reading.
    #[must_use]
    pub fn consolidated(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        format: OutputFormat,
    ) -> GenerationRequest {
        let detail = self.context.detail;
        let mut prompt = self.preamble("full reading", intention);
        prompt.push_str("The spread:\n");
        for (i, card) in cards.iter().enumerate() {
            write_card_line(&mut prompt, i, card);
        }
        prompt.push('\n');

        match format {
            OutputFormat::Structured => {
                prompt.push_str("Respond with JSON only, in exactly this shape:\n");
                prompt.push_str(
                    r#"{"preview":{"headline":"...","summary":"..."},"fullContent":{"overview":"...","cardInsights":[{"position":"...","cardName":"...","insight":"..."}],"synthesis":"...","guidance":"...","timing":"...","keyInsight":"...","reflectionPrompts":["..."],"conclusion":"..."}}"#,
                );
                let _ = writeln!(
                    prompt,
                    "\nInclude exactly {} entries in cardInsights, one per card, in the order listed.",
                    cards.len()
                );
            }
            OutputFormat::Legacy => {
                prompt.push_str(
                    "Write the reading as flowing prose without headings or JSON. \
                     Address each card in the order listed, then draw them together.\n",
                );
            }
        }
        let _ = writeln!(
            prompt,
            "Aim for about {} words per card.",
            detail.words_per_card()
        );

        let card_count = u32::try_from(cards.len()).unwrap_or(u32::MAX);
        GenerationRequest {
            prompt,
            max_output_tokens: detail
                .card_tokens()
                .saturating_mul(card_count)
                .saturating_add(2 * detail.section_tokens()),
            temperature: READING_TEMPERATURE,
        }
    }

    /// Prompt for the overview and preview of a decomposed reading.
    #[must_use]
    pub fn overview(&self, intention: &str, cards: &[DrawnCard]) -> GenerationRequest {
        let mut prompt = self.preamble("overview", intention);
        prompt.push_str("The spread:\n");
        for (i, card) in cards.iter().enumerate() {
            write_card_summary(&mut prompt, i, card);
        }
        prompt.push_str(
            "\nIntroduce the reading as a whole without interpreting individual cards in depth.\n",
        );
        prompt.push_str("Respond with JSON only, in exactly this shape:\n");
        prompt.push_str(r#"{"preview":{"headline":"...","summary":"..."},"overview":"..."}"#);
        prompt.push('\n');

        GenerationRequest {
            prompt,
            max_output_tokens: self.context.detail.section_tokens(),
            temperature: READING_TEMPERATURE,
        }
    }

    /// Prompt for the card at `index`, or `None` if `index` is out of range.
    #[must_use]
    pub fn per_card(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        index: usize,
    ) -> Option<GenerationRequest> {
        cards
            .get(index)
            .map(|card| self.card_prompt(intention, cards, index, card))
    }

    fn card_prompt(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        index: usize,
        card: &DrawnCard,
    ) -> GenerationRequest {
        let detail = self.context.detail;
        let task = format!("card {} of {}", index + 1, cards.len());
        let mut prompt = self.preamble(&task, intention);

        prompt.push_str("Interpret only this card:\n");
        write_card_line(&mut prompt, index, card);

        if cards.len() > 1 {
            prompt.push_str("\nFor context, the other cards in the spread are:\n");
            for (i, card) in cards.iter().enumerate().filter(|(i, _)| *i != index) {
                write_card_summary(&mut prompt, i, card);
            }
        }

        let _ = writeln!(
            prompt,
            "\nAim for about {} words. Respond with JSON only, in exactly this shape:",
            detail.words_per_card()
        );
        prompt.push_str(r#"{"insight":"..."}"#);
        prompt.push('\n');

        GenerationRequest {
            prompt,
            max_output_tokens: detail.card_tokens(),
            temperature: READING_TEMPERATURE,
        }
    }

    /// Prompt for synthesis, guidance, timing and closing.
    #[must_use]
    pub fn meta(&self, intention: &str, cards: &[DrawnCard]) -> GenerationRequest {
        let mut prompt = self.preamble("synthesis", intention);
        prompt.push_str("The spread:\n");
        for (i, card) in cards.iter().enumerate() {
            write_card_summary(&mut prompt, i, card);
        }
        prompt.push_str(
            "\nDraw the cards together: how they relate, what to do, when, \
             and the single most important takeaway.\n",
        );
        prompt.push_str("Respond with JSON only, in exactly this shape:\n");
        prompt.push_str(
            r#"{"synthesis":"...","guidance":"...","timing":"...","keyInsight":"...","reflectionPrompts":["...","...","..."],"conclusion":"..."}"#,
        );
        prompt.push('\n');

        GenerationRequest {
            prompt,
            max_output_tokens: self.context.detail.section_tokens(),
            temperature: META_TEMPERATURE,
        }
    }

    /// The full fan-out set: overview, one per card, meta.
    #[must_use]
    pub fn decomposed(&self, intention: &str, cards: &[DrawnCard]) -> DecomposedPrompts {
        DecomposedPrompts {
            overview: self.overview(intention, cards),
            cards: cards
                .iter()
                .enumerate()
                .map(|(i, card)| self.card_prompt(intention, cards, i, card))
                .collect(),
            meta: self.meta(intention, cards),
        }
    }

    fn preamble(&self, task: &str, intention: &str) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Task: {task}");
        prompt.push_str("You are an experienced tarot reader. ");
        prompt.push_str(self.context.style.voice());
        prompt.push('\n');

        let intention = intention.trim();
        if intention.is_empty() {
            prompt.push_str(
                "The querent has not stated an intention; give a general reading.\n",
            );
        } else {
            let _ = writeln!(prompt, "The querent's intention: \"{intention}\"");
        }

        let personal = &self.context.personalization;
        if let Some(name) = personal.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(prompt, "Address the querent as {}.", name.trim());
        }
        if !personal.focus_areas.is_empty() {
            let _ = writeln!(
                prompt,
                "They care most about: {}.",
                personal.focus_areas.join(", ")
            );
        }
        if !personal.recent_themes.is_empty() {
            let _ = writeln!(
                prompt,
                "Themes from their recent readings: {}.",
                personal.recent_themes.join(", ")
            );
        }
        prompt.push('\n');
        prompt
    }
}

fn write_card_line(buf: &mut String, index: usize, card: &DrawnCard) {
    let _ = write!(
        buf,
        "{}. {} ({}): {}, {}.",
        index + 1,
        card.position,
        card.position_meaning,
        card.card.name,
        card.orientation
    );
    if !card.card.keywords.is_empty() {
        let _ = write!(buf, " Keywords: {}.", card.card.keywords.join(", "));
    }
    let _ = writeln!(buf, " Traditional meaning: {}", card.meaning());
}

fn write_card_summary(buf: &mut String, index: usize, card: &DrawnCard) {
    let _ = writeln!(
        buf,
        "{}. {}: {} ({})",
        index + 1,
        card.position,
        card.card.name,
        card.orientation
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_test_support::sample_drawn_cards;

    #[test]
    fn test_consolidated_structured_names_every_card_and_count() {
        let context = GenerationContext::default();
        let cards = sample_drawn_cards(3);

        let request =
            PromptBuilder::new(&context).consolidated("Will I move?", &cards, OutputFormat::Structured);

        assert!(request.prompt.starts_with("Task: full reading"));
        assert!(request.prompt.contains("\"Will I move?\""));
        for card in &cards {
            assert!(request.prompt.contains(&card.card.name));
            assert!(request.prompt.contains(card.meaning()));
        }
        assert!(request.prompt.contains("exactly 3 entries"));
        assert_eq!(request.max_output_tokens, 3 * 600 + 2 * 700);
    }

    #[test]
    fn test_consolidated_legacy_asks_for_prose() {
        let context = GenerationContext::default();
        let cards = sample_drawn_cards(2);

        let request = PromptBuilder::new(&context).consolidated("", &cards, OutputFormat::Legacy);

        assert!(request.prompt.contains("flowing prose"));
        assert!(!request.prompt.contains("cardInsights"));
        assert!(request.prompt.contains("general reading"));
    }

    #[test]
    fn test_per_card_focuses_on_one_card_with_light_context() {
        let context = GenerationContext::default();
        let cards = sample_drawn_cards(4);

        let request = PromptBuilder::new(&context)
            .per_card("Career", &cards, 2)
            .unwrap();

        assert!(request.prompt.starts_with("Task: card 3 of 4"));
        // Only the focus card carries its traditional meaning.
        assert!(request.prompt.contains(cards[2].meaning()));
        assert!(!request.prompt.contains(cards[0].meaning()));
        assert!(request.prompt.contains(&cards[0].card.name));
        assert_eq!(request.max_output_tokens, DetailMode::Standard.card_tokens());
    }

    #[test]
    fn test_per_card_out_of_range_is_none() {
        let context = GenerationContext::default();
        let cards = sample_drawn_cards(3);

        assert!(PromptBuilder::new(&context).per_card("Career", &cards, 3).is_none());
        assert!(PromptBuilder::new(&context).per_card("Career", &[], 0).is_none());
    }

    #[test]
    fn test_decomposed_has_one_prompt_per_card_plus_two() {
        let context = GenerationContext {
            detail: DetailMode::Deep,
            ..GenerationContext::default()
        };
        let cards = sample_drawn_cards(10);

        let prompts = PromptBuilder::new(&context).decomposed("Love", &cards);

        assert_eq!(prompts.cards.len(), 10);
        assert!(prompts.overview.prompt.starts_with("Task: overview"));
        assert!(prompts.meta.prompt.starts_with("Task: synthesis"));
        assert_eq!(prompts.meta.max_output_tokens, 1_200);
        for (i, request) in prompts.cards.iter().enumerate() {
            assert!(request.prompt.starts_with(&format!("Task: card {} of 10", i + 1)));
        }
    }

    #[test]
    fn test_personalization_rendered_only_when_present() {
        let cards = sample_drawn_cards(1);
        let plain = GenerationContext::default();
        let personal = GenerationContext {
            personalization: PersonalizationContext {
                display_name: Some("Rowan".to_owned()),
                focus_areas: vec!["career".to_owned(), "health".to_owned()],
                recent_themes: vec!["renewal".to_owned()],
            },
            style: StyleMode::Practical,
            detail: DetailMode::Concise,
        };

        let without = PromptBuilder::new(&plain).overview("Focus", &cards);
        let with = PromptBuilder::new(&personal).overview("Focus", &cards);

        assert!(!without.prompt.contains("Address the querent"));
        assert!(with.prompt.contains("Address the querent as Rowan."));
        assert!(with.prompt.contains("career, health"));
        assert!(with.prompt.contains("renewal"));
        assert!(with.prompt.contains("actionable"));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let context = GenerationContext::default();
        let cards = sample_drawn_cards(6);
        let builder = PromptBuilder::new(&context);

        assert_eq!(builder.decomposed("Same", &cards), builder.decomposed("Same", &cards));
    }
}
