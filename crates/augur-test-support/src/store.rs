//! Test stores: mock `ReadingStore` implementations for tests.

use async_trait::async_trait;
use augur_core::error::ReadingError;
use augur_core::store::{NewReadingRecord, ReadingRecord, ReadingStore};

/// A store that always returns a persistence error. Useful for testing
/// degradation paths.
#[derive(Debug)]
pub struct FailingReadingStore;

#[async_trait]
impl ReadingStore for FailingReadingStore {
    async fn insert(&self, _record: NewReadingRecord) -> Result<ReadingRecord, ReadingError> {
        Err(ReadingError::PersistenceFailed("connection refused".into()))
    }

    async fn select_by_user(
        &self,
        _user_id: &str,
        _record_type: &str,
        _limit: usize,
    ) -> Result<Vec<ReadingRecord>, ReadingError> {
        Err(ReadingError::PersistenceFailed("connection refused".into()))
    }

    async fn delete_by_id(&self, _id: &str, _user_id: &str) -> Result<(), ReadingError> {
        Err(ReadingError::PersistenceFailed("connection refused".into()))
    }
}
