//! Basket totals calculation.

use projections::BasketProjection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::services::{DiscountService, DiscountType, PriceService};

/// VAT rate applied to items and shipping (20%).
pub const VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Monetary breakdown of a basket for one destination country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketTotals {
    /// Sum of list prices.
    pub subtotal_before_discounts: Decimal,

    /// Savings from per-item discounted prices.
    pub item_discounts: Decimal,

    /// Savings from the basket's discount code.
    pub discount_code_amount: Decimal,

    pub subtotal_after_discounts: Decimal,
    pub vat_on_items: Decimal,
    pub shipping_cost: Decimal,
    pub shipping_vat: Decimal,
    pub total_without_vat: Decimal,
    pub total_with_vat: Decimal,
    pub total_savings: Decimal,
}

/// Computes the totals of a projected basket.
///
/// Percentage codes only discount lines that sell at their list price; fixed
/// codes take their value off the basket; unknown types and unknown codes
/// are ignored. A country with no shipping cost ships for free.
pub async fn calculate_totals<P, D>(
    projection: &BasketProjection,
    country_code: &str,
    prices: &P,
    discounts: &D,
) -> Result<BasketTotals>
where
    P: PriceService + ?Sized,
    D: DiscountService + ?Sized,
{
    let mut subtotal_before_discounts = Decimal::ZERO;
    let mut item_discounts = Decimal::ZERO;
    let mut subtotal_of_full_price_items = Decimal::ZERO;

    for item in &projection.items {
        let quote = prices.get_price(&item.product_id).await?;
        let quantity = Decimal::from(item.quantity);

        subtotal_before_discounts += quote.base_price * quantity;
        item_discounts += (quote.base_price - quote.discounted_price) * quantity;
        if quote.is_full_price() {
            subtotal_of_full_price_items += quote.base_price * quantity;
        }
    }

    let mut discount_code_amount = Decimal::ZERO;
    if let Some(code) = projection
        .discount_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
    {
        if let Some(discount) = discounts.get_discount(code).await? {
            discount_code_amount = match discount.kind {
                DiscountType::Percentage => {
                    subtotal_of_full_price_items * (discount.value / Decimal::ONE_HUNDRED)
                }
                DiscountType::Fixed => discount.value,
                DiscountType::Other(ref kind) => {
                    tracing::warn!(code, kind = %kind, "ignoring discount code of unknown type");
                    Decimal::ZERO
                }
            };
        }
    }

    let subtotal_after_discounts = subtotal_before_discounts - item_discounts - discount_code_amount;
    let vat_on_items = subtotal_after_discounts * VAT_RATE;

    let shipping_cost = projection
        .shipping_cost(country_code)
        .unwrap_or(Decimal::ZERO);
    let shipping_vat = shipping_cost * VAT_RATE;

    let total_without_vat = subtotal_after_discounts + shipping_cost;
    let total_with_vat = total_without_vat + vat_on_items + shipping_vat;

    Ok(BasketTotals {
        subtotal_before_discounts,
        item_discounts,
        discount_code_amount,
        subtotal_after_discounts,
        vat_on_items,
        shipping_cost,
        shipping_vat,
        total_without_vat,
        total_with_vat,
        total_savings: item_discounts + discount_code_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TotalsError;
    use crate::services::{
        Discount, InMemoryDiscountService, InMemoryPriceService, PriceQuote,
    };
    use common::{BasketId, ProductId};
    use projections::ProjectionItem;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn projection(items: &[(&str, u32)]) -> BasketProjection {
        let basket_id = BasketId::new("b1");
        BasketProjection {
            id: basket_id.stream_id(),
            basket_id,
            discount_code: None,
            items: items
                .iter()
                .map(|(product_id, quantity)| ProjectionItem {
                    product_id: ProductId::new(*product_id),
                    quantity: *quantity,
                })
                .collect(),
            shipping_costs: Default::default(),
        }
    }

    #[test]
    fn test_vat_rate_is_twenty_percent() {
        assert_eq!(VAT_RATE, Decimal::new(20, 2));
    }

    #[tokio::test]
    async fn test_item_discount_single_line() {
        let prices = InMemoryPriceService::new();
        prices.set_price("prod-1", PriceQuote::new(dec(10), dec(8))).await;

        let totals = calculate_totals(
            &projection(&[("prod-1", 2)]),
            "GB",
            &prices,
            &InMemoryDiscountService::new(),
        )
        .await
        .unwrap();

        assert_eq!(totals.subtotal_before_discounts, dec(20));
        assert_eq!(totals.item_discounts, dec(4));
        assert_eq!(totals.subtotal_after_discounts, dec(16));
    }

    #[tokio::test]
    async fn test_mixed_lines_with_shipping() {
        let prices = InMemoryPriceService::new();
        prices.set_price("prod-1", PriceQuote::new(dec(100), dec(80))).await;
        prices.set_price("prod-2", PriceQuote::full_price(dec(50))).await;

        let mut basket = projection(&[("prod-1", 2), ("prod-2", 1)]);
        basket.shipping_costs.insert("GB".to_string(), dec(10));

        let totals = calculate_totals(&basket, "GB", &prices, &InMemoryDiscountService::new())
            .await
            .unwrap();

        assert_eq!(
            totals,
            BasketTotals {
                subtotal_before_discounts: dec(250),
                item_discounts: dec(40),
                discount_code_amount: dec(0),
                subtotal_after_discounts: dec(210),
                vat_on_items: dec(42),
                shipping_cost: dec(10),
                shipping_vat: dec(2),
                total_without_vat: dec(220),
                total_with_vat: dec(264),
                total_savings: dec(40),
            }
        );
    }

    #[tokio::test]
    async fn test_percentage_code() {
        let prices = InMemoryPriceService::with_default(PriceQuote::full_price(dec(100)));
        let discounts = InMemoryDiscountService::new();
        discounts.insert(Discount::percentage("SAVE10", dec(10))).await;

        let mut basket = projection(&[("prod-1", 2)]);
        basket.discount_code = Some("SAVE10".to_string());

        let totals = calculate_totals(&basket, "GB", &prices, &discounts)
            .await
            .unwrap();

        assert_eq!(totals.discount_code_amount, dec(20));
        assert_eq!(totals.subtotal_after_discounts, dec(180));
        assert_eq!(totals.total_savings, dec(20));
    }

    #[tokio::test]
    async fn test_fixed_code() {
        let prices = InMemoryPriceService::with_default(PriceQuote::full_price(dec(50)));
        let discounts = InMemoryDiscountService::new();
        discounts.insert(Discount::fixed("SAVE5", dec(5))).await;

        let mut basket = projection(&[("prod-1", 1)]);
        basket.discount_code = Some("SAVE5".to_string());

        let totals = calculate_totals(&basket, "GB", &prices, &discounts)
            .await
            .unwrap();

        assert_eq!(totals.discount_code_amount, dec(5));
        assert_eq!(totals.subtotal_after_discounts, dec(45));
    }

    #[tokio::test]
    async fn test_percentage_code_skips_discounted_items() {
        let prices = InMemoryPriceService::sample();
        let discounts = InMemoryDiscountService::sample();

        let mut basket = projection(&[("prod-1", 1), ("notDiscounted", 2)]);
        basket.discount_code = Some("half".to_string());

        let totals = calculate_totals(&basket, "GB", &prices, &discounts)
            .await
            .unwrap();

        // Half of the two full-price items only.
        assert_eq!(totals.discount_code_amount, dec(10));
        assert_eq!(totals.item_discounts, dec(2));
        assert_eq!(totals.subtotal_after_discounts, dec(18));
    }

    #[tokio::test]
    async fn test_unknown_code_type_and_blank_code_are_ignored() {
        let prices = InMemoryPriceService::with_default(PriceQuote::full_price(dec(10)));
        let discounts = InMemoryDiscountService::new();
        discounts
            .insert(Discount::new("BOGO", "buy-one-get-one", dec(1)))
            .await;

        let mut basket = projection(&[("prod-1", 1)]);
        basket.discount_code = Some("BOGO".to_string());
        let totals = calculate_totals(&basket, "GB", &prices, &discounts)
            .await
            .unwrap();
        assert_eq!(totals.discount_code_amount, dec(0));

        // A blank code never reaches the discount service.
        discounts.set_fail_on_lookup(true).await;
        basket.discount_code = Some("   ".to_string());
        let totals = calculate_totals(&basket, "GB", &prices, &discounts)
            .await
            .unwrap();
        assert_eq!(totals.discount_code_amount, dec(0));
    }

    #[tokio::test]
    async fn test_unknown_country_ships_free() {
        let prices = InMemoryPriceService::with_default(PriceQuote::full_price(dec(10)));
        let mut basket = projection(&[("prod-1", 1)]);
        basket.shipping_costs.insert("GB".to_string(), dec(5));

        let totals = calculate_totals(&basket, "FR", &prices, &InMemoryDiscountService::new())
            .await
            .unwrap();

        assert_eq!(totals.shipping_cost, dec(0));
        assert_eq!(totals.shipping_vat, dec(0));
        assert_eq!(totals.total_with_vat, dec(12));
    }

    #[tokio::test]
    async fn test_price_failure_fails_whole_calculation() {
        let prices = InMemoryPriceService::sample();
        prices.set_fail_on_lookup(true).await;

        let result = calculate_totals(
            &projection(&[("prod-1", 1)]),
            "GB",
            &prices,
            &InMemoryDiscountService::sample(),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, TotalsError::PriceService(_)));
        assert_eq!(err.kind(), common::FailureKind::DependencyFailure);
    }

    #[tokio::test]
    async fn test_empty_basket_totals_are_zero() {
        let totals = calculate_totals(
            &projection(&[]),
            "GB",
            &InMemoryPriceService::new(),
            &InMemoryDiscountService::new(),
        )
        .await
        .unwrap();

        assert_eq!(totals.total_with_vat, Decimal::ZERO);
    }
}
