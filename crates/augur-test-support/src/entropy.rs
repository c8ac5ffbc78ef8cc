//! Test entropy: deterministic `EntropySource` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use augur_core::entropy::EntropySource;
use augur_core::error::ReadingError;

/// An entropy source that hands out values from a predetermined sequence.
/// Each request consumes the next `count` values; a request that would run
/// past the end fails with `EntropyUnavailable`.
#[derive(Debug)]
pub struct SequenceEntropy {
    values: Vec<u32>,
    cursor: Mutex<usize>,
    requests: Mutex<Vec<usize>>,
}

impl SequenceEntropy {
    /// Create a new `SequenceEntropy` with the given values.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self {
            values,
            cursor: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the `count` argument of every request made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntropySource for SequenceEntropy {
    async fn request(&self, count: usize) -> Result<Vec<u32>, ReadingError> {
        self.requests.lock().unwrap().push(count);
        let mut cursor = self.cursor.lock().unwrap();
        let end = *cursor + count;
        if end > self.values.len() {
            return Err(ReadingError::EntropyUnavailable(
                "sequence exhausted".to_owned(),
            ));
        }
        let slice = self.values[*cursor..end].to_vec();
        *cursor = end;
        Ok(slice)
    }
}

/// An entropy source that always fails. Records how often it was asked.
#[derive(Debug, Default)]
pub struct FailingEntropy {
    calls: Mutex<usize>,
}

impl FailingEntropy {
    /// Number of requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl EntropySource for FailingEntropy {
    async fn request(&self, _count: usize) -> Result<Vec<u32>, ReadingError> {
        *self.calls.lock().unwrap() += 1;
        Err(ReadingError::EntropyUnavailable("quota exceeded".into()))
    }
}
