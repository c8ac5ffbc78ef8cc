//! Persistent store abstraction.
//!
//! Stored readings keep only card identities, positions and orientations;
//! full card content is re-joined from the reference tables on load.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deck::Orientation;
use crate::error::ReadingError;

/// Record type under which readings are stored.
pub const READING_RECORD_TYPE: &str = "reading";

/// Lightweight reference to a drawn card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCard {
    /// Card identity within the deck.
    pub card_id: String,
    /// Spread position the card filled.
    pub position: String,
    /// Orientation it was drawn in.
    pub orientation: Orientation,
}

/// Serialized body of a stored reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload {
    /// The stated intention.
    pub intention: String,
    /// Spread identity.
    pub spread_id: String,
    /// Position names in spread order, kept so a retired spread can be rebuilt.
    pub positions: Vec<String>,
    /// Drawn cards in position order.
    pub cards: Vec<StoredCard>,
    /// Interpretation document, serialized.
    pub interpretation: serde_json::Value,
    /// `ai` or `static`.
    pub source: String,
}

/// A record awaiting insertion; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReadingRecord {
    /// Owning user.
    pub user_id: String,
    /// Record type, see [`READING_RECORD_TYPE`].
    pub record_type: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Record body.
    pub payload: ReadingPayload,
}

impl NewReadingRecord {
    /// Attaches an identifier, producing a stored record.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> ReadingRecord {
        ReadingRecord {
            id: id.into(),
            user_id: self.user_id,
            record_type: self.record_type,
            created_at: self.created_at,
            payload: self.payload,
        }
    }
}

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Record type.
    pub record_type: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Record body.
    pub payload: ReadingPayload,
}

/// Boundary to the persistent store. Records are append-only and user-scoped.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Inserts a record and returns it with its assigned id.
    async fn insert(&self, record: NewReadingRecord) -> Result<ReadingRecord, ReadingError>;

    /// Returns up to `limit` of a user's records of the given type, newest first.
    async fn select_by_user(
        &self,
        user_id: &str,
        record_type: &str,
        limit: usize,
    ) -> Result<Vec<ReadingRecord>, ReadingError>;

    /// Deletes a record owned by `user_id`.
    async fn delete_by_id(&self, id: &str, user_id: &str) -> Result<(), ReadingError>;
}
