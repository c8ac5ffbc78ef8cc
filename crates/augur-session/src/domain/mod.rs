//! Domain layer for the session context.

pub mod aggregates;
