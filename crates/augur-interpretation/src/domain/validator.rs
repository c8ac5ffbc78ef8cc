//! Structural checks on raw service responses.
//!
//! These are lexical checks only: length bounds, refusal phrasing, and the
//! card-count invariant of structured documents. Nothing here judges
//! whether a reading is any good.

use augur_core::error::ReadingError;
use thiserror::Error;

use super::document::StructuredReading;

/// Why a response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Nothing but whitespace.
    #[error("response is empty")]
    Empty,

    /// The service declined to produce a reading.
    #[error("service declined: matched \"{0}\"")]
    Declined(String),

    /// Shorter than the minimum; likely truncated.
    #[error("response too short: {length} < {min} chars")]
    TooShort {
        /// Observed length in chars.
        length: usize,
        /// Minimum accepted.
        min: usize,
    },

    /// Longer than the maximum; likely runaway output.
    #[error("response too long: {length} > {max} chars")]
    TooLong {
        /// Observed length in chars.
        length: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// A structured document whose insights do not match the drawn cards.
    #[error("expected {expected} card insights, found {actual}")]
    CardCountMismatch {
        /// Number of drawn cards.
        expected: usize,
        /// Number of insights in the document.
        actual: usize,
    },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl Rejection {
    /// Short machine-readable reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Declined(_) => "declined",
            Self::TooShort { .. } => "too_short",
            Self::TooLong { .. } => "too_long",
            Self::CardCountMismatch { .. } => "card_count_mismatch",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<Rejection> for ReadingError {
    fn from(rejection: Rejection) -> Self {
        ReadingError::ValidationFailed(rejection.to_string())
    }
}

/// Accepted length range, in chars of trimmed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthLimits {
    /// Inclusive minimum.
    pub min_chars: usize,
    /// Inclusive maximum.
    pub max_chars: usize,
}

impl LengthLimits {
    /// Limits for a complete reading in one response.
    pub const DOCUMENT: Self = Self {
        min_chars: 200,
        max_chars: 30_000,
    };

    /// Limits for one section of a decomposed reading.
    pub const SECTION: Self = Self {
        min_chars: 40,
        max_chars: 8_000,
    };
}

const REFUSAL_PHRASES: &[&str] = &[
    "i cannot provide",
    "i can't provide",
    "i'm unable to",
    "i am unable to",
    "i cannot help",
    "i can't help",
    "i'm sorry, but i can",
    "as an ai language model",
    "i won't be able to",
];

/// Refusals open a response; the same words deeper in a reading are prose.
const REFUSAL_WINDOW_CHARS: usize = 160;

/// Validates raw responses before they are trusted.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    refusal_phrases: Vec<String>,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self {
            refusal_phrases: REFUSAL_PHRASES.iter().map(|&p| p.to_owned()).collect(),
        }
    }
}

impl ResponseValidator {
    /// A validator with an extra set of refusal phrases on top of the defaults.
    #[must_use]
    pub fn with_refusal_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validator = Self::default();
        validator
            .refusal_phrases
            .extend(phrases.into_iter().map(|p| normalize(&p.into())));
        validator
    }

    /// Checks a raw response against `limits` and the refusal list.
    ///
    /// Checks run in order: empty, declined, too short, too long. Refusals
    /// are checked before length because refusals are usually short. Only
    /// the opening of a prose response is scanned for refusal phrasing; a
    /// response that opens as a JSON document is never treated as a refusal.
    ///
    /// # Errors
    ///
    /// Returns the first `Rejection` that applies.
    pub fn validate(&self, text: &str, limits: LengthLimits) -> Result<(), Rejection> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Rejection::Empty);
        }

        let opening = refusal_window(trimmed);
        if let Some(phrase) = opening.as_deref().and_then(|opening| {
            self.refusal_phrases
                .iter()
                .find(|phrase| opening.contains(phrase.as_str()))
        }) {
            return Err(Rejection::Declined(phrase.clone()));
        }

        let length = trimmed.chars().count();
        if length < limits.min_chars {
            return Err(Rejection::TooShort {
                length,
                min: limits.min_chars,
            });
        }
        if length > limits.max_chars {
            return Err(Rejection::TooLong {
                length,
                max: limits.max_chars,
            });
        }
        Ok(())
    }

    /// Checks that a structured document has one insight per drawn card.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::CardCountMismatch` when the counts differ.
    pub fn validate_structured(
        &self,
        reading: &StructuredReading,
        drawn_cards: usize,
    ) -> Result<(), Rejection> {
        let actual = reading.full_content.card_insights.len();
        if actual != drawn_cards {
            return Err(Rejection::CardCountMismatch {
                expected: drawn_cards,
                actual,
            });
        }
        Ok(())
    }
}

fn refusal_window(trimmed: &str) -> Option<String> {
    if trimmed.starts_with('{') || trimmed.starts_with("```") {
        return None;
    }
    let opening: String = trimmed.chars().take(REFUSAL_WINDOW_CHARS).collect();
    Some(normalize(&opening))
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}
