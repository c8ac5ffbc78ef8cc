//! Process-local `ReadingStore`, used when no database is configured.

use std::sync::Mutex;

use async_trait::async_trait;
use augur_core::error::ReadingError;
use augur_core::store::{NewReadingRecord, ReadingRecord, ReadingStore};
use uuid::Uuid;

/// Keeps records in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryReadingStore {
    records: Mutex<Vec<ReadingRecord>>,
}

impl InMemoryReadingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// True when no records are held.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> ReadingError {
    ReadingError::PersistenceFailed("in-memory store lock poisoned".to_owned())
}

#[async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn insert(&self, record: NewReadingRecord) -> Result<ReadingRecord, ReadingError> {
        let stored = record.with_id(Uuid::now_v7().to_string());
        self.records.lock().map_err(poisoned)?.push(stored.clone());
        Ok(stored)
    }

    async fn select_by_user(
        &self,
        user_id: &str,
        record_type: &str,
        limit: usize,
    ) -> Result<Vec<ReadingRecord>, ReadingError> {
        let records = self.records.lock().map_err(poisoned)?;
        let mut matching: Vec<ReadingRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id && r.record_type == record_type)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn delete_by_id(&self, id: &str, user_id: &str) -> Result<(), ReadingError> {
        self.records
            .lock()
            .map_err(poisoned)?
            .retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(())
    }
}
