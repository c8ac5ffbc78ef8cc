//! Application layer for the drawing context.

pub mod card_drawer;
