//! Augur: card drawing bounded context.
//!
//! Turns entropy into a duplicate-free, oriented set of cards bound to
//! the positions of a spread.

pub mod application;
pub mod domain;
