//! Basket totals for the query side.
//!
//! Totals are computed on demand from a basket's read model:
//! 1. Price each line through the [`PriceService`]
//! 2. Apply the basket's discount code through the [`DiscountService`]
//! 3. Add VAT and the shipping cost for the requested country
//!
//! Any collaborator failure fails the whole query; partial totals are never
//! returned.

pub mod calculator;
pub mod error;
pub mod service;
pub mod services;

pub use calculator::{BasketTotals, VAT_RATE, calculate_totals};
pub use error::{Result, TotalsError};
pub use service::TotalsService;
pub use services::{
    Discount, DiscountService, DiscountType, InMemoryDiscountService, InMemoryPriceService,
    PriceQuote, PriceService,
};
