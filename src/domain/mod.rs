//! Domain layer types and invariants.

pub mod chat;
pub mod error;
