//! Augur Core: shared domain abstractions.
//!
//! This crate defines the reference data, error taxonomy, and the traits
//! standing in for every external collaborator of the reading pipeline
//! (entropy feed, generative text service, persistent store). Apart from
//! the system clock and thread RNG it contains no infrastructure code.

pub mod clock;
pub mod deck;
pub mod entropy;
pub mod error;
pub mod generation;
pub mod spread;
pub mod store;
