//! Application layer for the session context.

pub mod state_machine;
