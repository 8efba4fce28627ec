//! Totals error types.

use common::{BasketId, FailureKind};
use projections::ProjectionError;
use thiserror::Error;

/// Errors that can occur while computing basket totals.
#[derive(Debug, Error)]
pub enum TotalsError {
    /// No read model exists for the basket.
    #[error("Basket not found: {0}")]
    BasketNotFound(BasketId),

    /// Price lookup failed.
    #[error("Price service error: {0}")]
    PriceService(String),

    /// Discount code lookup failed.
    #[error("Discount service error: {0}")]
    DiscountService(String),

    /// Read model store error.
    #[error("Read model error: {0}")]
    ReadModel(#[from] ProjectionError),
}

impl TotalsError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::BasketNotFound(_) => FailureKind::NotFound,
            Self::PriceService(_) | Self::DiscountService(_) | Self::ReadModel(_) => {
                FailureKind::DependencyFailure
            }
        }
    }
}

/// Convenience type alias for totals results.
pub type Result<T> = std::result::Result<T, TotalsError>;
