//! Test generators: mock `TextGenerator` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use augur_core::error::ReadingError;
use augur_core::generation::{GenerationRequest, TextGenerator};

type Script = dyn Fn(&GenerationRequest) -> Result<String, ReadingError> + Send + Sync;

/// A generator whose responses come from a closure over the request. Every
/// request is recorded so tests can assert on call counts and prompt text.
pub struct ScriptedGenerator {
    script: Box<Script>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Create a generator driven by `script`.
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, ReadingError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A generator that answers every request with the same text.
    #[must_use]
    pub fn constant(response: &str) -> Self {
        let response = response.to_owned();
        Self::new(move |_| Ok(response.clone()))
    }

    /// Returns a snapshot of all requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl std::fmt::Debug for ScriptedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedGenerator")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn submit(&self, request: GenerationRequest) -> Result<String, ReadingError> {
        let response = (self.script)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// A generator that fails every call with `GenerationUnavailable`.
#[derive(Debug, Default)]
pub struct FailingGenerator {
    calls: Mutex<usize>,
}

impl FailingGenerator {
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
impl TextGenerator for FailingGenerator {
    async fn submit(&self, _request: GenerationRequest) -> Result<String, ReadingError> {
        *self.calls.lock().unwrap() += 1;
        Err(ReadingError::GenerationUnavailable("connection refused".into()))
    }
}
