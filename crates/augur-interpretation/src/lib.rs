//! Augur: interpretation generation bounded context.
//!
//! Renders prompts from a drawn set, calls the generative text service in
//! one consolidated request or a fan-out of section requests, validates and
//! assembles the responses, and degrades to an offline template reading
//! whenever anything along the way fails.

pub mod application;
pub mod domain;
