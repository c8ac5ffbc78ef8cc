//! Application layer for the interpretation context.

pub mod orchestrator;
