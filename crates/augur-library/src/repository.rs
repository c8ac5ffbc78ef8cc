//! Reading repository.
//!
//! Stored records carry card identities, positions and orientations only.
//! `load` re-joins them against the deck and spread catalog.

use std::sync::Arc;

use augur_core::clock::Clock;
use augur_core::deck::{Deck, DrawnCard};
use augur_core::error::ReadingError;
use augur_core::spread::{SpreadCatalog, SpreadDefinition};
use augur_core::store::{
    NewReadingRecord, READING_RECORD_TYPE, ReadingPayload, ReadingRecord, ReadingStore, StoredCard,
};
use augur_interpretation::domain::document::{GeneratedReading, Interpretation, ReadingSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Prefix of identifiers minted locally when the store is unavailable.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A finished reading, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedReading {
    /// Owning user.
    pub user_id: String,
    /// The stated intention.
    pub intention: String,
    /// The spread used.
    pub spread: SpreadDefinition,
    /// Cards in position order.
    pub cards: Vec<DrawnCard>,
    /// Generated document and its provenance.
    pub reading: GeneratedReading,
}

/// A reading as known to the caller after save or load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedReading {
    /// Store-assigned id, or a [`LOCAL_ID_PREFIX`] id if the store was unavailable.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The stated intention.
    pub intention: String,
    /// The spread used.
    pub spread: SpreadDefinition,
    /// Cards in position order.
    pub cards: Vec<DrawnCard>,
    /// The interpretation document.
    pub interpretation: Interpretation,
    /// Who produced the interpretation.
    pub source: ReadingSource,
}

impl PersistedReading {
    /// True when the reading was not durably stored.
    #[must_use]
    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}

/// True for identifiers in the local namespace.
#[must_use]
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Persists and reconstructs readings.
pub struct ReadingRepository {
    store: Arc<dyn ReadingStore>,
    deck: Option<Arc<Deck>>,
    spreads: Arc<SpreadCatalog>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ReadingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingRepository")
            .field("deck_loaded", &self.deck.is_some())
            .finish_non_exhaustive()
    }
}

impl ReadingRepository {
    /// Creates a repository over `store`, joining loads against `deck` and `spreads`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReadingStore>,
        deck: Option<Arc<Deck>>,
        spreads: Arc<SpreadCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            deck,
            spreads,
            clock,
        }
    }

    /// Saves a completed reading. Never fails: if the store rejects the
    /// write, the returned reading carries a locally minted id.
    #[instrument(skip_all, fields(user_id = %reading.user_id))]
    pub async fn save(&self, reading: CompletedReading) -> PersistedReading {
        let created_at = self.clock.now();
        let stored = match to_record(&reading, created_at) {
            Ok(record) => self.store.insert(record).await,
            Err(e) => Err(e),
        };

        let id = match stored {
            Ok(record) => record.id,
            Err(e) => {
                let id = format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7());
                warn!(error = %e, %id, "reading not persisted; keeping local copy");
                id
            }
        };

        PersistedReading {
            id,
            user_id: reading.user_id,
            created_at,
            intention: reading.intention,
            spread: reading.spread,
            cards: reading.cards,
            interpretation: reading.reading.interpretation,
            source: reading.reading.source,
        }
    }

    /// Loads a user's most recent readings, newest first.
    ///
    /// Records whose cards are missing from the deck, or whose body cannot
    /// be decoded, are skipped. A spread that is no longer in the catalog is
    /// rebuilt from the stored position names.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::DeckUnavailable` if no deck is configured and
    /// `ReadingError::PersistenceFailed` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn load(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PersistedReading>, ReadingError> {
        let deck = self
            .deck
            .as_deref()
            .ok_or_else(|| ReadingError::DeckUnavailable("no deck configured".to_owned()))?;
        let records = self
            .store
            .select_by_user(user_id, READING_RECORD_TYPE, limit)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                self.reconstruct(deck, record)
                    .inspect_err(|e| warn!(%id, error = %e, "skipping unreadable reading"))
                    .ok()
            })
            .collect())
    }

    /// Deletes a reading. Local ids were never stored, so deleting one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), ReadingError> {
        if is_local_id(id) {
            return Ok(());
        }
        self.store.delete_by_id(id, user_id).await
    }

    fn reconstruct(
        &self,
        deck: &Deck,
        record: ReadingRecord,
    ) -> Result<PersistedReading, ReadingError> {
        let payload = record.payload;
        let spread = self.spreads.find(&payload.spread_id).cloned().unwrap_or_else(|| {
            warn!(spread_id = %payload.spread_id, "unknown spread; synthesizing from stored positions");
            SpreadDefinition::synthesized(&payload.spread_id, &payload.positions)
        });

        let cards = payload
            .cards
            .iter()
            .map(|stored| {
                let card = deck.find(&stored.card_id).ok_or_else(|| {
                    ReadingError::DeckUnavailable(format!("unknown card id: {}", stored.card_id))
                })?;
                let position_meaning = spread
                    .positions
                    .iter()
                    .find(|p| p.name == stored.position)
                    .map(|p| p.meaning.clone())
                    .unwrap_or_default();
                Ok(DrawnCard {
                    card: card.clone(),
                    position: stored.position.clone(),
                    orientation: stored.orientation,
                    position_meaning,
                })
            })
            .collect::<Result<Vec<_>, ReadingError>>()?;

        let interpretation: Interpretation = serde_json::from_value(payload.interpretation)
            .map_err(|e| ReadingError::PersistenceFailed(format!("interpretation: {e}")))?;
        let source = ReadingSource::parse(&payload.source).ok_or_else(|| {
            ReadingError::PersistenceFailed(format!("unknown source: {}", payload.source))
        })?;

        Ok(PersistedReading {
            id: record.id,
            user_id: record.user_id,
            created_at: record.created_at,
            intention: payload.intention,
            spread,
            cards,
            interpretation,
            source,
        })
    }
}

fn to_record(
    reading: &CompletedReading,
    created_at: DateTime<Utc>,
) -> Result<NewReadingRecord, ReadingError> {
    let interpretation = serde_json::to_value(&reading.reading.interpretation)
        .map_err(|e| ReadingError::PersistenceFailed(format!("interpretation: {e}")))?;
    Ok(NewReadingRecord {
        user_id: reading.user_id.clone(),
        record_type: READING_RECORD_TYPE.to_owned(),
        created_at,
        payload: ReadingPayload {
            intention: reading.intention.clone(),
            spread_id: reading.spread.id.clone(),
            positions: reading.spread.positions.iter().map(|p| p.name.clone()).collect(),
            cards: reading
                .cards
                .iter()
                .map(|c| StoredCard {
                    card_id: c.card.id.clone(),
                    position: c.position.clone(),
                    orientation: c.orientation,
                })
                .collect(),
            interpretation,
            source: reading.reading.source.as_str().to_owned(),
        },
    })
}
