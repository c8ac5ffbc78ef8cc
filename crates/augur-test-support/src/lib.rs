//! Shared test mocks and utilities for the Augur reading pipeline.

mod clock;
mod entropy;
mod fixtures;
mod generator;
mod store;

pub use clock::FixedClock;
pub use entropy::{FailingEntropy, SequenceEntropy};
pub use fixtures::{sample_deck, sample_drawn_cards, sample_spread};
pub use generator::{FailingGenerator, ScriptedGenerator};
pub use store::FailingReadingStore;
