//! Price service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::TotalsError;

/// A product's list price and its current selling price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub discounted_price: Decimal,
}

impl PriceQuote {
    pub fn new(base_price: Decimal, discounted_price: Decimal) -> Self {
        Self {
            base_price,
            discounted_price,
        }
    }

    /// A quote with no item-level discount.
    pub fn full_price(price: Decimal) -> Self {
        Self::new(price, price)
    }

    /// Returns true if the product sells at its list price.
    pub fn is_full_price(&self) -> bool {
        self.base_price == self.discounted_price
    }
}

/// Trait for product price lookups.
#[async_trait]
pub trait PriceService: Send + Sync {
    /// Returns the price quote for a product.
    async fn get_price(&self, product_id: &ProductId) -> Result<PriceQuote, TotalsError>;
}

#[async_trait]
impl<T: PriceService + ?Sized> PriceService for Arc<T> {
    async fn get_price(&self, product_id: &ProductId) -> Result<PriceQuote, TotalsError> {
        (**self).get_price(product_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPriceState {
    quotes: HashMap<ProductId, PriceQuote>,
    default_quote: Option<PriceQuote>,
    fail_on_lookup: bool,
}

/// In-memory price catalogue.
///
/// Products without an explicit quote fall back to the default quote, if one
/// is configured.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceService {
    state: Arc<RwLock<InMemoryPriceState>>,
}

impl InMemoryPriceService {
    /// Creates an empty catalogue with no default quote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalogue that quotes every product at the given price.
    pub fn with_default(quote: PriceQuote) -> Self {
        Self::from_state(InMemoryPriceState {
            default_quote: Some(quote),
            ..Default::default()
        })
    }

    /// Catalogue used when no pricing backend is configured.
    ///
    /// Every product is 10.00 discounted to 8.00, except `notDiscounted`,
    /// which sells at its 10.00 list price.
    pub fn sample() -> Self {
        Self::from_state(InMemoryPriceState {
            quotes: HashMap::from([(
                ProductId::new("notDiscounted"),
                PriceQuote::full_price(Decimal::new(10, 0)),
            )]),
            default_quote: Some(PriceQuote::new(Decimal::new(10, 0), Decimal::new(8, 0))),
            fail_on_lookup: false,
        })
    }

    fn from_state(state: InMemoryPriceState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Sets the quote for a product.
    pub async fn set_price(&self, product_id: impl Into<ProductId>, quote: PriceQuote) {
        self.state.write().await.quotes.insert(product_id.into(), quote);
    }

    /// Configures the service to fail every lookup.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }
}

#[async_trait]
impl PriceService for InMemoryPriceService {
    async fn get_price(&self, product_id: &ProductId) -> Result<PriceQuote, TotalsError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(TotalsError::PriceService("Price lookup failed".to_string()));
        }

        state
            .quotes
            .get(product_id)
            .copied()
            .or(state.default_quote)
            .ok_or_else(|| TotalsError::PriceService(format!("No price for product {product_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_quote_wins_over_default() {
        let service = InMemoryPriceService::with_default(PriceQuote::full_price(Decimal::ONE));
        service
            .set_price("prod-1", PriceQuote::new(Decimal::new(100, 0), Decimal::new(80, 0)))
            .await;

        let quote = service.get_price(&"prod-1".into()).await.unwrap();
        assert_eq!(quote.discounted_price, Decimal::new(80, 0));

        let fallback = service.get_price(&"prod-2".into()).await.unwrap();
        assert_eq!(fallback, PriceQuote::full_price(Decimal::ONE));
    }

    #[tokio::test]
    async fn test_unknown_product_without_default_fails() {
        let service = InMemoryPriceService::new();

        let result = service.get_price(&"prod-1".into()).await;

        assert!(matches!(result, Err(TotalsError::PriceService(_))));
    }

    #[tokio::test]
    async fn test_sample_catalogue() {
        let service = InMemoryPriceService::sample();

        let discounted = service.get_price(&"anything".into()).await.unwrap();
        assert_eq!(
            discounted,
            PriceQuote::new(Decimal::new(10, 0), Decimal::new(8, 0))
        );

        let full = service.get_price(&"notDiscounted".into()).await.unwrap();
        assert!(full.is_full_price());
    }

    #[tokio::test]
    async fn test_fail_on_lookup() {
        let service = InMemoryPriceService::sample();
        service.set_fail_on_lookup(true).await;

        assert!(service.get_price(&"prod-1".into()).await.is_err());
    }
}
