//! External pricing and discount collaborators with in-memory implementations.

pub mod discount;
pub mod price;

pub use discount::{Discount, DiscountService, DiscountType, InMemoryDiscountService};
pub use price::{InMemoryPriceService, PriceQuote, PriceService};
