//! Domain error types.

use common::FailureKind;
use event_store::EventStoreError;
use thiserror::Error;

use crate::basket::BasketError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The basket rejected the command.
    #[error(transparent)]
    Basket(#[from] BasketError),

    /// A stored event could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            DomainError::EventStore(e) => e.kind(),
            DomainError::Basket(e) => e.kind(),
            DomainError::Serialization(_) => FailureKind::UnexpectedFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, StreamId};
    use event_store::Version;

    #[test]
    fn test_kinds_follow_source_error() {
        let err = DomainError::from(BasketError::ItemNotFound {
            product_id: ProductId::new("prod-9"),
        });
        assert_eq!(err.kind(), FailureKind::ValidationFailure);
        assert_eq!(err.to_string(), "Item not found: prod-9");

        let err = DomainError::from(EventStoreError::ConcurrencyConflict {
            stream_id: StreamId::new("basket-b1"),
            expected: Version::new(1),
            actual: Version::new(2),
        });
        assert_eq!(err.kind(), FailureKind::ConcurrencyConflict);
    }
}
