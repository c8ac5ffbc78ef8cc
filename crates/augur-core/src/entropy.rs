//! Entropy source abstraction.
//!
//! Card selection consumes integers from an external feed. In production
//! this is either a remote generator or the thread RNG; in tests a
//! recorded sequence is injected.

use async_trait::async_trait;
use rand::Rng;

use crate::error::ReadingError;

/// Supplier of non-negative random integers.
#[async_trait]
pub trait EntropySource: Send + Sync {
    /// Requests exactly `count` integers.
    ///
    /// # Errors
    ///
    /// Returns `ReadingError::EntropyUnavailable` on transport or quota failure.
    async fn request(&self, count: usize) -> Result<Vec<u32>, ReadingError>;
}

/// Entropy source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadEntropy;

impl ThreadEntropy {
    fn fill(count: usize) -> Vec<u32> {
        let mut rng = rand::rng();
        (0..count).map(|_| rng.random::<u32>()).collect()
    }
}

#[async_trait]
impl EntropySource for ThreadEntropy {
    async fn request(&self, count: usize) -> Result<Vec<u32>, ReadingError> {
        Ok(Self::fill(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_thread_entropy_returns_requested_count() {
        let values = ThreadEntropy.request(12).await.unwrap();
        assert_eq!(values.len(), 12);
    }

    #[tokio::test]
    async fn test_thread_entropy_zero_count_is_empty() {
        let values = ThreadEntropy.request(0).await.unwrap();
        assert!(values.is_empty());
    }
}
