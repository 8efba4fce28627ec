//! Discount code service trait and in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::TotalsError;

/// How a discount code's value is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountType {
    /// Percent off the full-price items.
    Percentage,
    /// Flat amount off the basket.
    Fixed,
    /// A type this service does not know how to apply.
    Other(String),
}

impl From<&str> for DiscountType {
    fn from(value: &str) -> Self {
        match value {
            "percentage" => Self::Percentage,
            "fixed" => Self::Fixed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentage => f.write_str("percentage"),
            Self::Fixed => f.write_str("fixed"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// A discount code as returned by the discount service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    pub code: String,
    pub kind: DiscountType,
    pub value: Decimal,
}

impl Discount {
    pub fn new(code: impl Into<String>, kind: impl Into<DiscountType>, value: Decimal) -> Self {
        Self {
            code: code.into(),
            kind: kind.into(),
            value,
        }
    }

    pub fn percentage(code: impl Into<String>, percent: Decimal) -> Self {
        Self::new(code, DiscountType::Percentage, percent)
    }

    pub fn fixed(code: impl Into<String>, amount: Decimal) -> Self {
        Self::new(code, DiscountType::Fixed, amount)
    }
}

/// Trait for discount code lookups.
#[async_trait]
pub trait DiscountService: Send + Sync {
    /// Looks up a discount code. Returns None for unknown codes.
    async fn get_discount(&self, code: &str) -> Result<Option<Discount>, TotalsError>;
}

#[async_trait]
impl<T: DiscountService + ?Sized> DiscountService for Arc<T> {
    async fn get_discount(&self, code: &str) -> Result<Option<Discount>, TotalsError> {
        (**self).get_discount(code).await
    }
}

#[derive(Debug, Default)]
struct InMemoryDiscountState {
    /// Keyed by upper-cased code.
    discounts: HashMap<String, Discount>,
    fail_on_lookup: bool,
}

/// In-memory discount catalogue with case-insensitive code lookup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiscountService {
    state: Arc<RwLock<InMemoryDiscountState>>,
}

impl InMemoryDiscountService {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue used when no discount backend is configured: `HALF` is 50%
    /// off full-price items.
    pub fn sample() -> Self {
        let half = Discount::percentage("HALF", Decimal::new(50, 0));
        Self {
            state: Arc::new(RwLock::new(InMemoryDiscountState {
                discounts: HashMap::from([(half.code.to_uppercase(), half)]),
                fail_on_lookup: false,
            })),
        }
    }

    /// Adds or replaces a discount code.
    pub async fn insert(&self, discount: Discount) {
        self.state
            .write()
            .await
            .discounts
            .insert(discount.code.to_uppercase(), discount);
    }

    /// Configures the service to fail every lookup.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }
}

#[async_trait]
impl DiscountService for InMemoryDiscountService {
    async fn get_discount(&self, code: &str) -> Result<Option<Discount>, TotalsError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(TotalsError::DiscountService(
                "Discount lookup failed".to_string(),
            ));
        }

        Ok(state.discounts.get(&code.to_uppercase()).cloned())
    }
}
