//! Generation orchestrator.
//!
//! Small spreads go to the service as one consolidated request. Large
//! spreads fan out into an overview request, one request per card and a
//! closing request, all in flight together; the results are joined only
//! once every call has settled and are re-associated to positions by index.
//!
//! `generate` never returns an error. Transport failures, timeouts,
//! validation rejections and assembly failures all end in the offline
//! template reading.

use std::sync::Arc;

use augur_core::deck::DrawnCard;
use augur_core::error::ReadingError;
use augur_core::generation::{GenerationRequest, TextGenerator};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::domain::document::{
    self, CardInsight, GeneratedReading, Interpretation, ReadingSource,
};
use crate::domain::fallback::{fallback_card_insight, fallback_reading};
use crate::domain::prompt::{GenerationContext, OutputFormat, PromptBuilder};
use crate::domain::validator::{LengthLimits, Rejection, ResponseValidator};

/// Spreads with at least this many cards use the parallel strategy.
pub const PARALLEL_THRESHOLD: usize = 6;

/// How a reading is requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One consolidated request.
    SingleCall,
    /// Overview, one request per card, and meta, issued concurrently.
    Parallel,
}

impl Strategy {
    /// Picks the strategy for a spread of `card_count` cards.
    #[must_use]
    pub fn select(card_count: usize, threshold: usize) -> Self {
        if card_count >= threshold {
            Self::Parallel
        } else {
            Self::SingleCall
        }
    }

    /// Number of service requests this strategy issues for `card_count` cards.
    #[must_use]
    pub fn request_count(self, card_count: usize) -> usize {
        match self {
            Self::SingleCall => 1,
            Self::Parallel => card_count + 2,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Output shape for single-call readings. Parallel readings are always structured.
    pub format: OutputFormat,
    /// Card count at which the parallel strategy kicks in.
    pub parallel_threshold: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Structured,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}

/// Turns a drawn set into an interpretation document.
pub struct GenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    validator: ResponseValidator,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("validator", &self.validator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GenerationOrchestrator {
    /// Creates an orchestrator with the default validator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, config: OrchestratorConfig) -> Self {
        Self::with_validator(generator, ResponseValidator::default(), config)
    }

    /// Creates an orchestrator with a custom validator.
    #[must_use]
    pub fn with_validator(
        generator: Arc<dyn TextGenerator>,
        validator: ResponseValidator,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            generator,
            validator,
            config,
        }
    }

    /// The strategy used for `card_count` cards.
    #[must_use]
    pub fn strategy_for(&self, card_count: usize) -> Strategy {
        Strategy::select(card_count, self.config.parallel_threshold)
    }

    /// Generates a reading. Always returns a usable document.
    #[instrument(skip_all, fields(cards = cards.len()))]
    pub async fn generate(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        context: &GenerationContext,
    ) -> GeneratedReading {
        let strategy = self.strategy_for(cards.len());
        let attempt = match strategy {
            Strategy::SingleCall => self.single_call(intention, cards, context).await,
            Strategy::Parallel => self.parallel(intention, cards, context).await,
        };

        match attempt {
            Ok(interpretation) => {
                info!(?strategy, "reading generated");
                GeneratedReading {
                    interpretation,
                    source: ReadingSource::Ai,
                }
            }
            Err(e) => {
                warn!(?strategy, error = %e, "generation failed; using template reading");
                GeneratedReading {
                    interpretation: Interpretation::Legacy {
                        text: fallback_reading(intention, cards),
                    },
                    source: ReadingSource::Static,
                }
            }
        }
    }

    async fn single_call(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        context: &GenerationContext,
    ) -> Result<Interpretation, ReadingError> {
        let format = self.config.format;
        let request = PromptBuilder::new(context).consolidated(intention, cards, format);
        let text = self.generator.submit(request).await?;
        self.validator.validate(&text, LengthLimits::DOCUMENT)?;

        match format {
            OutputFormat::Legacy => Ok(Interpretation::Legacy {
                text: text.trim().to_owned(),
            }),
            OutputFormat::Structured => {
                let reading = document::parse_full(&text, cards)?;
                self.validator.validate_structured(&reading, cards.len())?;
                Ok(Interpretation::StructuredV2(reading))
            }
        }
    }

    async fn parallel(
        &self,
        intention: &str,
        cards: &[DrawnCard],
        context: &GenerationContext,
    ) -> Result<Interpretation, ReadingError> {
        let prompts = PromptBuilder::new(context).decomposed(intention, cards);

        let overview = self.section(prompts.overview, document::parse_overview);
        let meta = self.section(prompts.meta, document::parse_meta);
        let insights = join_all(
            prompts
                .cards
                .into_iter()
                .zip(cards)
                .enumerate()
                .map(|(index, (request, card))| self.card_insight(index, request, card)),
        );

        let (overview, insights, meta) = futures::join!(overview, insights, meta);
        let reading = document::assemble(overview?, insights, meta?);
        self.validator.validate_structured(&reading, cards.len())?;
        Ok(Interpretation::StructuredV2(reading))
    }

    async fn card_insight(
        &self,
        index: usize,
        request: GenerationRequest,
        card: &DrawnCard,
    ) -> CardInsight {
        match self
            .section(request, |text| document::parse_card_insight(text, card))
            .await
        {
            Ok(insight) => insight,
            Err(e) => {
                warn!(position = index, error = %e, "card insight failed; using template insight");
                fallback_card_insight(card)
            }
        }
    }

    async fn section<T, F>(&self, request: GenerationRequest, parse: F) -> Result<T, ReadingError>
    where
        F: FnOnce(&str) -> Result<T, Rejection>,
    {
        let text = self.generator.submit(request).await?;
        self.validator.validate(&text, LengthLimits::SECTION)?;
        Ok(parse(&text)?)
    }
}
