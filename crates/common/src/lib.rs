//! Shared types for the basket service.

pub mod failure;
pub mod types;

pub use failure::FailureKind;
pub use types::{BasketId, ProductId, StreamId};
