//! Regulars Shared Types and Utilities
//!
//! This crate contains the record types, error taxonomy, and field
//! normalization shared across the Regulars membership engine.

pub mod error;
pub mod fields;
pub mod types;

pub use error::*;
pub use fields::normalize_key;
pub use types::*;
