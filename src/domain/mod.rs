//! Domain layer types and invariants.

pub mod error;
pub mod profiles;
pub mod render;
