//! Route modules.

pub mod health;
pub mod readings;
pub mod sessions;
pub mod spreads;
