//! Helpers used across the crate.
//!
//! - [`code_generator`] - Short code generation and validation
//! - [`url_normalizer`] - Target URL validation and metrics host keys

pub mod code_generator;
pub mod url_normalizer;
