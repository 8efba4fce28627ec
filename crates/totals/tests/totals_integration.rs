//! Integration tests: basket commands → projection rebuild → totals query.

use common::{BasketId, FailureKind};
use domain::{
    AddItems, AdjustItemQuantity, BasketService, ItemToAdd, SetDiscountCode, SetShippingCost,
};
use event_store::InMemoryEventStore;
use projections::{InMemoryReadModelStore, ProjectionWorker};
use rust_decimal::Decimal;
use totals::{
    Discount, InMemoryDiscountService, InMemoryPriceService, PriceQuote, TotalsError,
    TotalsService,
};

struct TestHarness {
    baskets: BasketService<InMemoryEventStore>,
    worker: ProjectionWorker<InMemoryEventStore, InMemoryReadModelStore>,
    prices: InMemoryPriceService,
    discounts: InMemoryDiscountService,
    totals: TotalsService<InMemoryReadModelStore, InMemoryPriceService, InMemoryDiscountService>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        let read_models = InMemoryReadModelStore::new();
        let prices = InMemoryPriceService::new();
        let discounts = InMemoryDiscountService::new();

        Self {
            baskets: BasketService::new(store.clone()),
            worker: ProjectionWorker::new(store, read_models.clone()),
            totals: TotalsService::new(read_models, prices.clone(), discounts.clone()),
            prices,
            discounts,
        }
    }

    async fn project(&self, basket_id: &str) {
        self.worker
            .rebuild(&BasketId::new(basket_id).stream_id())
            .await
            .unwrap();
    }
}

fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

#[tokio::test]
async fn test_totals_for_discounted_items_and_shipping() {
    let h = TestHarness::new();
    h.prices
        .set_price("prod-1", PriceQuote::new(dec(100), dec(80)))
        .await;
    h.prices
        .set_price("prod-2", PriceQuote::full_price(dec(50)))
        .await;

    h.baskets
        .add_items(AddItems::new(
            "b1",
            vec![ItemToAdd::new("prod-1", 2), ItemToAdd::new("prod-2", 1)],
        ))
        .await
        .unwrap();
    h.baskets
        .set_shipping_cost(SetShippingCost::new("b1", "GB", dec(10)))
        .await
        .unwrap();
    h.project("b1").await;

    let totals = h.totals.get_totals(&BasketId::new("b1"), "GB").await.unwrap();

    assert_eq!(totals.subtotal_before_discounts, dec(250));
    assert_eq!(totals.item_discounts, dec(40));
    assert_eq!(totals.subtotal_after_discounts, dec(210));
    assert_eq!(totals.vat_on_items, dec(42));
    assert_eq!(totals.shipping_vat, dec(2));
    assert_eq!(totals.total_without_vat, dec(220));
    assert_eq!(totals.total_with_vat, dec(264));
    assert_eq!(totals.total_savings, dec(40));
}

#[tokio::test]
async fn test_totals_reflect_removed_line_and_code() {
    let h = TestHarness::new();
    h.prices
        .set_price("prod-1", PriceQuote::full_price(dec(100)))
        .await;
    h.prices
        .set_price("prod-2", PriceQuote::full_price(dec(40)))
        .await;
    h.discounts
        .insert(Discount::percentage("SAVE10", dec(10)))
        .await;

    h.baskets
        .add_items(AddItems::new(
            "b1",
            vec![ItemToAdd::new("prod-1", 2), ItemToAdd::new("prod-2", 1)],
        ))
        .await
        .unwrap();
    h.baskets
        .adjust_item_quantity(AdjustItemQuantity::new("b1", "prod-2", -1))
        .await
        .unwrap();
    h.baskets
        .set_discount_code(SetDiscountCode::new("b1", "save10"))
        .await
        .unwrap();
    h.project("b1").await;

    let totals = h.totals.get_totals(&BasketId::new("b1"), "GB").await.unwrap();

    assert_eq!(totals.subtotal_before_discounts, dec(200));
    assert_eq!(totals.discount_code_amount, dec(20));
    assert_eq!(totals.shipping_cost, dec(0));
}

#[tokio::test]
async fn test_totals_before_projection_is_not_found() {
    let h = TestHarness::new();
    h.baskets
        .add_items(AddItems::single("b1", "prod-1", 1))
        .await
        .unwrap();

    let err = h
        .totals
        .get_totals(&BasketId::new("b1"), "GB")
        .await
        .unwrap_err();

    assert!(matches!(err, TotalsError::BasketNotFound(_)));
    assert_eq!(err.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn test_unpriced_product_is_dependency_failure() {
    let h = TestHarness::new();
    h.baskets
        .add_items(AddItems::single("b1", "mystery", 1))
        .await
        .unwrap();
    h.project("b1").await;

    let err = h
        .totals
        .get_totals(&BasketId::new("b1"), "GB")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::DependencyFailure);
}
