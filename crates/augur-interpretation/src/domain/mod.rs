//! Domain layer for the interpretation context.

pub mod document;
pub mod fallback;
pub mod prompt;
pub mod validator;
