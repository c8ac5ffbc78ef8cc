//! Augur: reading session bounded context.
//!
//! Drives one reading from spread selection through drawing, reveal and
//! interpretation to save, and detaches late async results from sessions
//! that have been cleared or restarted in the meantime.

pub mod application;
pub mod domain;
