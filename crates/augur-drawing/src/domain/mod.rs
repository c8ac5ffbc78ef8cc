//! Domain layer for the drawing context.

pub mod assignment;
