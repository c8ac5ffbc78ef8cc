//! Interpretation documents and the parsers that build them from service
//! responses.
//!
//! A reading is either legacy plain text or a version 2 structured
//! document. The two shapes are told apart once, when the document is
//! produced, and carried as a tagged union from then on.

use augur_core::deck::{DrawnCard, Orientation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::validator::Rejection;

/// Current structured document version.
pub const STRUCTURED_VERSION: u8 = 2;

/// A generated interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Interpretation {
    /// Plain prose.
    Legacy {
        /// The reading text.
        text: String,
    },
    /// Sectioned document with one insight per drawn card.
    StructuredV2(StructuredReading),
}

impl Interpretation {
    /// Number of per-card insights, or `None` for legacy text.
    #[must_use]
    pub fn card_insight_count(&self) -> Option<usize> {
        match self {
            Self::Legacy { .. } => None,
            Self::StructuredV2(reading) => Some(reading.full_content.card_insights.len()),
        }
    }
}

/// Version 2 structured reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReading {
    /// Document version, always [`STRUCTURED_VERSION`].
    pub version: u8,
    /// Short teaser shown before the full reading.
    pub preview: Preview,
    /// The full reading.
    pub full_content: FullContent,
}

/// Teaser section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// One-line headline.
    pub headline: String,
    /// A few sentences summarizing the reading.
    pub summary: String,
}

/// Body of a structured reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContent {
    /// Opening overview of the spread as a whole.
    pub overview: String,
    /// One entry per drawn card, in position order.
    pub card_insights: Vec<CardInsight>,
    /// How the cards relate to each other.
    pub synthesis: String,
    /// Practical guidance.
    pub guidance: String,
    /// Timing notes.
    pub timing: String,
    /// The single most important takeaway.
    pub key_insight: String,
    /// Questions for the querent to reflect on.
    pub reflection_prompts: Vec<String>,
    /// Closing words.
    pub conclusion: String,
}

/// Interpretation of one drawn card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInsight {
    /// Spread position.
    pub position: String,
    /// Card display name.
    pub card_name: String,
    /// Orientation the card was drawn in.
    pub orientation: Orientation,
    /// The interpretation text.
    pub insight: String,
}

/// Where a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    /// Produced by the generative text service.
    Ai,
    /// Produced offline by the template fallback.
    Static,
}

impl ReadingSource {
    /// Storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Static => "static",
        }
    }

    /// Parses a storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ai" => Some(Self::Ai),
            "static" => Some(Self::Static),
            _ => None,
        }
    }
}

/// What the orchestrator hands back: a usable document and its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReading {
    /// The document.
    pub interpretation: Interpretation,
    /// `Static` iff the fallback template produced it.
    pub source: ReadingSource,
}

/// Overview section of a decomposed reading.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverviewSection {
    /// Teaser.
    pub preview: Preview,
    /// Opening overview.
    pub overview: String,
}

/// Closing sections of a decomposed reading.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSection {
    /// How the cards relate to each other.
    pub synthesis: String,
    /// Practical guidance.
    pub guidance: String,
    /// Timing notes.
    pub timing: String,
    /// Most important takeaway.
    pub key_insight: String,
    /// Reflection questions.
    #[serde(default)]
    pub reflection_prompts: Vec<String>,
    /// Closing words.
    pub conclusion: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullReadingWire {
    preview: Preview,
    full_content: FullContentWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullContentWire {
    overview: String,
    card_insights: Vec<CardInsightWire>,
    #[serde(flatten)]
    meta: MetaSection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardInsightWire {
    #[serde(default)]
    position: String,
    #[serde(default)]
    card_name: String,
    #[serde(default)]
    orientation: Option<Orientation>,
    insight: String,
}

/// Returns the outermost `{...}` span of a response, tolerating markdown
/// fences or chatter around it.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, Rejection> {
    let body = extract_json(text)
        .ok_or_else(|| Rejection::Malformed("no JSON object found".to_owned()))?;
    serde_json::from_str(body).map_err(|e| Rejection::Malformed(e.to_string()))
}

fn require_text(field: &str, value: &str) -> Result<(), Rejection> {
    if value.trim().is_empty() {
        return Err(Rejection::Malformed(format!("{field} is empty")));
    }
    Ok(())
}

/// Builds the insight for a drawn card; identity fields come from the card,
/// never from the service.
#[must_use]
pub fn insight_for(card: &DrawnCard, insight: String) -> CardInsight {
    CardInsight {
        position: card.position.clone(),
        card_name: card.card.name.clone(),
        orientation: card.orientation,
        insight,
    }
}

/// Parses a consolidated response into a structured reading.
///
/// Insights are re-associated to drawn cards by index. The insight count is
/// not checked here; see [`super::validator::ResponseValidator::validate_structured`].
///
/// # Errors
///
/// Returns `Rejection::Malformed` if the response is not the expected JSON.
pub fn parse_full(text: &str, cards: &[DrawnCard]) -> Result<StructuredReading, Rejection> {
    let wire: FullReadingWire = parse_json(text)?;
    require_text("overview", &wire.full_content.overview)?;

    let card_insights = wire
        .full_content
        .card_insights
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match cards.get(i) {
            Some(card) => insight_for(card, entry.insight),
            None => CardInsight {
                position: entry.position,
                card_name: entry.card_name,
                orientation: entry.orientation.unwrap_or(Orientation::Upright),
                insight: entry.insight,
            },
        })
        .collect();

    Ok(StructuredReading {
        version: STRUCTURED_VERSION,
        preview: wire.preview,
        full_content: content_from(wire.full_content.overview, card_insights, wire.full_content.meta),
    })
}

/// Parses the overview section of a decomposed reading.
///
/// # Errors
///
/// Returns `Rejection::Malformed` if the response is not the expected JSON.
pub fn parse_overview(text: &str) -> Result<OverviewSection, Rejection> {
    let section: OverviewSection = parse_json(text)?;
    require_text("overview", &section.overview)?;
    Ok(section)
}

/// Parses a per-card section for `card`.
///
/// # Errors
///
/// Returns `Rejection::Malformed` if the response is not the expected JSON.
pub fn parse_card_insight(text: &str, card: &DrawnCard) -> Result<CardInsight, Rejection> {
    let wire: CardInsightWire = parse_json(text)?;
    require_text("insight", &wire.insight)?;
    Ok(insight_for(card, wire.insight))
}

/// Parses the closing sections of a decomposed reading.
///
/// # Errors
///
/// Returns `Rejection::Malformed` if the response is not the expected JSON.
pub fn parse_meta(text: &str) -> Result<MetaSection, Rejection> {
    let section: MetaSection = parse_json(text)?;
    require_text("synthesis", &section.synthesis)?;
    Ok(section)
}

fn content_from(overview: String, card_insights: Vec<CardInsight>, meta: MetaSection) -> FullContent {
    FullContent {
        overview,
        card_insights,
        synthesis: meta.synthesis,
        guidance: meta.guidance,
        timing: meta.timing,
        key_insight: meta.key_insight,
        reflection_prompts: meta.reflection_prompts,
        conclusion: meta.conclusion,
    }
}

/// Joins independently generated sections into one document.
#[must_use]
pub fn assemble(
    overview: OverviewSection,
    card_insights: Vec<CardInsight>,
    meta: MetaSection,
) -> StructuredReading {
    StructuredReading {
        version: STRUCTURED_VERSION,
        preview: overview.preview,
        full_content: content_from(overview.overview, card_insights, meta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_test_support::sample_drawn_cards;

    const META: &str = r#"{"synthesis":"The cards speak together.","guidance":"Go gently.","timing":"Within the season.","keyInsight":"Trust the process.","reflectionPrompts":["What are you holding?"],"conclusion":"Be well."}"#;

    #[test]
    fn test_extract_json_strips_markdown_fence() {
        let text = "Here you go:\n```json\n{\"insight\": \"x\"}\n```";
        assert_eq!(extract_json(text), Some("{\"insight\": \"x\"}"));
    }

    #[test]
    fn test_extract_json_none_without_object() {
        assert_eq!(extract_json("no braces here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_full_takes_identity_from_drawn_cards() {
        let cards = sample_drawn_cards(2);
        let text = r#"{
            "preview": {"headline": "A turning", "summary": "Change is near."},
            "fullContent": {
                "overview": "Two cards frame your question.",
                "cardInsights": [
                    {"position": "wrong", "cardName": "Wrong", "insight": "First insight."},
                    {"insight": "Second insight."}
                ],
                "synthesis": "Together they point forward.",
                "guidance": "Act.",
                "timing": "Soon.",
                "keyInsight": "Move.",
                "reflectionPrompts": ["Why now?"],
                "conclusion": "Onward."
            }
        }"#;

        let reading = parse_full(text, &cards).unwrap();

        assert_eq!(reading.version, STRUCTURED_VERSION);
        let insights = &reading.full_content.card_insights;
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].position, "Position 1");
        assert_eq!(insights[0].card_name, "Card 0");
        assert_eq!(insights[0].insight, "First insight.");
        assert_eq!(insights[1].orientation, Orientation::Reversed);
        assert_eq!(reading.full_content.key_insight, "Move.");
    }

    #[test]
    fn test_parse_full_keeps_surplus_insights_for_validation() {
        let cards = sample_drawn_cards(1);
        let text = r#"{"preview":{"headline":"h","summary":"s"},"fullContent":{"overview":"o",
            "cardInsights":[{"insight":"a"},{"insight":"b"}],
            "synthesis":"s","guidance":"g","timing":"t","keyInsight":"k","conclusion":"c"}}"#;

        let reading = parse_full(text, &cards).unwrap();

        assert_eq!(reading.full_content.card_insights.len(), 2);
        assert!(reading.full_content.reflection_prompts.is_empty());
    }

    #[test]
    fn test_parse_full_rejects_prose() {
        let cards = sample_drawn_cards(1);
        let result = parse_full("The cards suggest a new beginning.", &cards);
        assert!(matches!(result, Err(Rejection::Malformed(_))));
    }

    #[test]
    fn test_parse_card_insight_rejects_blank_insight() {
        let cards = sample_drawn_cards(1);
        let result = parse_card_insight(r#"{"insight": "   "}"#, &cards[0]);
        assert!(matches!(result, Err(Rejection::Malformed(_))));
    }

    #[test]
    fn test_assemble_joins_sections_in_given_order() {
        let cards = sample_drawn_cards(3);
        let overview = parse_overview(
            r#"{"preview":{"headline":"h","summary":"s"},"overview":"Three cards."}"#,
        )
        .unwrap();
        let insights = cards
            .iter()
            .map(|c| insight_for(c, format!("about {}", c.card.name)))
            .collect();
        let meta = parse_meta(META).unwrap();

        let reading = assemble(overview, insights, meta);

        let names: Vec<&str> = reading
            .full_content
            .card_insights
            .iter()
            .map(|i| i.card_name.as_str())
            .collect();
        assert_eq!(names, vec!["Card 0", "Card 1", "Card 2"]);
        assert_eq!(reading.full_content.overview, "Three cards.");
        assert_eq!(reading.full_content.reflection_prompts, vec!["What are you holding?"]);
    }

    #[test]
    fn test_interpretation_serializes_with_format_tag() {
        let legacy = Interpretation::Legacy {
            text: "plain".to_owned(),
        };
        let value = serde_json::to_value(&legacy).unwrap();
        assert_eq!(value["format"], "legacy");
        assert_eq!(value["text"], "plain");

        let round: Interpretation = serde_json::from_value(value).unwrap();
        assert_eq!(round, legacy);
        assert_eq!(round.card_insight_count(), None);
    }

    #[test]
    fn test_reading_source_parse_matches_as_str() {
        for source in [ReadingSource::Ai, ReadingSource::Static] {
            assert_eq!(ReadingSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(ReadingSource::parse("cached"), None);
    }
}
