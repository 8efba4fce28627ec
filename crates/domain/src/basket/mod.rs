//! Basket aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;

pub use aggregate::{Basket, BasketLine};
pub use commands::*;
pub use events::{
    BasketCreatedData, BasketEvent, BasketEventData, DiscountCodeSetData, ItemAddedData,
    ItemQuantityAdjustedData, ItemRemovedData, ShippingCostSetData,
};
pub use service::BasketService;

use common::{FailureKind, ProductId};
use event_store::Version;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during basket operations.
#[derive(Debug, Error)]
pub enum BasketError {
    /// The basket has no events yet.
    #[error("Basket has no events, add items first.")]
    NotCreated,

    /// The basket already exists.
    #[error("Basket already created")]
    AlreadyCreated,

    /// Product is not in the basket.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// The change would push a line past the largest representable quantity.
    #[error("Quantity of {product_id} would exceed {max}", max = u32::MAX)]
    QuantityOverflow { product_id: ProductId },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// An add-items request carried no items.
    #[error("At least one item is required")]
    NoItems,

    /// Shipping costs cannot be negative.
    #[error("Invalid shipping cost: {cost} (must not be negative)")]
    NegativeShippingCost { cost: Decimal },

    /// The caller passed a sequence number other than `version + 1`.
    #[error("Sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: Version, actual: Version },
}

impl BasketError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            BasketError::SequenceMismatch { .. } => FailureKind::UnexpectedFailure,
            _ => FailureKind::ValidationFailure,
        }
    }
}
