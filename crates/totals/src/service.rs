//! Totals query service.

use common::BasketId;
use projections::ReadModelStore;

use crate::calculator::{BasketTotals, calculate_totals};
use crate::error::{Result, TotalsError};
use crate::services::{DiscountService, PriceService};

/// Answers "what does this basket cost, shipped to this country?".
///
/// Reads the basket's projection, so totals may lag the latest commands.
pub struct TotalsService<R, P, D>
where
    R: ReadModelStore,
    P: PriceService,
    D: DiscountService,
{
    read_models: R,
    prices: P,
    discounts: D,
}

impl<R, P, D> TotalsService<R, P, D>
where
    R: ReadModelStore,
    P: PriceService,
    D: DiscountService,
{
    pub fn new(read_models: R, prices: P, discounts: D) -> Self {
        Self {
            read_models,
            prices,
            discounts,
        }
    }

    /// Computes the totals for a basket and destination country.
    #[tracing::instrument(skip(self))]
    pub async fn get_totals(
        &self,
        basket_id: &BasketId,
        country_code: &str,
    ) -> Result<BasketTotals> {
        metrics::counter!("basket_totals_queries_total").increment(1);

        let projection = self
            .read_models
            .get_projection(&basket_id.stream_id())
            .await?
            .ok_or_else(|| TotalsError::BasketNotFound(basket_id.clone()))?;

        let totals =
            calculate_totals(&projection, country_code, &self.prices, &self.discounts).await?;

        tracing::debug!(total_with_vat = %totals.total_with_vat, "totals calculated");
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryDiscountService, InMemoryPriceService};
    use common::FailureKind;
    use projections::{BasketProjection, InMemoryReadModelStore, ProjectionItem};
    use rust_decimal::Decimal;

    async fn service_with_basket() -> TotalsService<
        InMemoryReadModelStore,
        InMemoryPriceService,
        InMemoryDiscountService,
    > {
        let read_models = InMemoryReadModelStore::new();
        let basket_id = BasketId::new("b1");
        read_models
            .save_projection(&BasketProjection {
                id: basket_id.stream_id(),
                basket_id,
                discount_code: Some("HALF".to_string()),
                items: vec![ProjectionItem {
                    product_id: "notDiscounted".into(),
                    quantity: 2,
                }],
                shipping_costs: [("GB".to_string(), Decimal::new(5, 0))].into(),
            })
            .await
            .unwrap();

        TotalsService::new(
            read_models,
            InMemoryPriceService::sample(),
            InMemoryDiscountService::sample(),
        )
    }

    #[tokio::test]
    async fn test_get_totals_from_projection() {
        let service = service_with_basket().await;

        let totals = service
            .get_totals(&BasketId::new("b1"), "GB")
            .await
            .unwrap();

        assert_eq!(totals.subtotal_before_discounts, Decimal::new(20, 0));
        assert_eq!(totals.discount_code_amount, Decimal::new(10, 0));
        assert_eq!(totals.shipping_cost, Decimal::new(5, 0));
        assert_eq!(totals.total_with_vat, Decimal::new(18, 0));
    }

    #[tokio::test]
    async fn test_missing_projection_is_not_found() {
        let service = service_with_basket().await;

        let err = service
            .get_totals(&BasketId::new("missing"), "GB")
            .await
            .unwrap_err();

        assert!(matches!(err, TotalsError::BasketNotFound(_)));
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_discount_failure_is_dependency_failure() {
        let read_models = InMemoryReadModelStore::new();
        let basket_id = BasketId::new("b1");
        read_models
            .save_projection(&BasketProjection {
                id: basket_id.stream_id(),
                basket_id: basket_id.clone(),
                discount_code: Some("HALF".to_string()),
                items: vec![],
                shipping_costs: Default::default(),
            })
            .await
            .unwrap();
        let discounts = InMemoryDiscountService::sample();
        discounts.set_fail_on_lookup(true).await;
        let service = TotalsService::new(read_models, InMemoryPriceService::sample(), discounts);

        let err = service.get_totals(&basket_id, "GB").await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::DependencyFailure);
    }
}
