use common::FailureKind;
use thiserror::Error;

use crate::{StreamId, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrency conflict occurred when appending events.
    /// The expected event count did not match the stream's actual count.
    #[error(
        "Concurrency conflict on stream {stream_id}: expected {expected} events, found {actual}"
    )]
    ConcurrencyConflict {
        stream_id: StreamId,
        expected: Version,
        actual: Version,
    },

    /// An append was attempted with no events.
    #[error("Cannot append an empty batch to stream {0}")]
    EmptyAppend(StreamId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The change source could not be reached.
    #[error("Change source unavailable: {0}")]
    ChangeSourceUnavailable(String),
}

impl EventStoreError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            EventStoreError::ConcurrencyConflict { .. } => FailureKind::ConcurrencyConflict,
            EventStoreError::EmptyAppend(_) => FailureKind::ValidationFailure,
            EventStoreError::Database(_)
            | EventStoreError::Migration(_)
            | EventStoreError::ChangeSourceUnavailable(_) => FailureKind::DependencyFailure,
            EventStoreError::Serialization(_) => FailureKind::UnexpectedFailure,
        }
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
