//! Augur Library: persistence of completed readings.
//!
//! The repository never loses a reading from the caller's point of view:
//! when the store is unreachable it hands back a locally identified record
//! instead of an error.

pub mod memory_store;
pub mod pg_store;
pub mod repository;
pub mod schema;
