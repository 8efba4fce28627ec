//! Basket aggregate implementation.

use std::collections::BTreeMap;

use common::{BasketId, ProductId};
use event_store::Version;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    BasketError, BasketEvent, BasketEventData,
    events::{
        BasketCreatedData, DiscountCodeSetData, ItemAddedData, ItemQuantityAdjustedData,
        ItemRemovedData, ShippingCostSetData,
    },
};

/// A product line in a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketLine {
    pub product_id: ProductId,

    /// Always greater than zero.
    pub quantity: u32,
}

/// Basket aggregate root.
///
/// A basket is absent until its first `Created` event and stays active
/// forever after. Mutating operations take the sequence number the new event
/// will carry, which must be `version + 1`; each successful operation applies
/// its event immediately and queues it in the pending buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basket {
    id: Option<BasketId>,

    /// Lines in the order products were first added.
    lines: Vec<BasketLine>,

    discount_code: Option<String>,

    /// Shipping cost per country code.
    shipping_costs: BTreeMap<String, Decimal>,

    /// Number of events applied so far.
    version: Version,

    pending: Vec<BasketEvent>,
}

impl Aggregate for Basket {
    type Event = BasketEvent;
    type Error = BasketError;

    fn aggregate_type() -> &'static str {
        "Basket"
    }

    fn version(&self) -> Version {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.data {
            BasketEventData::Created(data) => {
                self.id = Some(data.basket_id.clone());
            }
            BasketEventData::ItemAdded(data) => self.apply_item_added(data),
            BasketEventData::ItemQuantityAdjusted(data) => {
                self.apply_quantity_delta(&data.product_id, i64::from(data.quantity_delta));
            }
            BasketEventData::ItemRemoved(data) => {
                self.lines.retain(|line| line.product_id != data.product_id);
            }
            BasketEventData::DiscountCodeSet(data) => {
                self.discount_code = Some(data.code.clone());
            }
            BasketEventData::ShippingCostSet(data) => {
                self.shipping_costs.insert(data.country_code.clone(), data.cost);
            }
        }
        self.version = self.version.next();
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending
    }

    fn take_pending_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.pending)
    }

    fn clear_pending_events(&mut self) {
        self.pending.clear();
    }
}

// Query methods
impl Basket {
    /// Returns the basket ID, or None if the basket has not been created.
    pub fn id(&self) -> Option<&BasketId> {
        self.id.as_ref()
    }

    /// Returns true once the basket has been created.
    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[BasketLine] {
        &self.lines
    }

    /// Returns the quantity of a product, or None if it is not in the basket.
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.find_line(product_id).map(|line| line.quantity)
    }

    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    pub fn shipping_costs(&self) -> &BTreeMap<String, Decimal> {
        &self.shipping_costs
    }

    fn find_line(&self, product_id: &ProductId) -> Option<&BasketLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }
}

// Command methods
impl Basket {
    /// Creates the basket.
    pub fn create(
        &mut self,
        basket_id: BasketId,
        sequence_number: Version,
    ) -> Result<(), BasketError> {
        if self.is_created() {
            return Err(BasketError::AlreadyCreated);
        }

        self.record(
            sequence_number,
            BasketEventData::Created(BasketCreatedData { basket_id }),
        )
    }

    /// Adds a quantity of a product, merging into an existing line.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        sequence_number: Version,
    ) -> Result<(), BasketError> {
        self.ensure_created()?;

        if quantity == 0 {
            return Err(BasketError::InvalidQuantity { quantity });
        }

        let overflows = self
            .quantity_of(&product_id)
            .is_some_and(|current| current.checked_add(quantity).is_none());
        if overflows {
            return Err(BasketError::QuantityOverflow { product_id });
        }

        self.record(
            sequence_number,
            BasketEventData::ItemAdded(ItemAddedData {
                product_id,
                quantity,
            }),
        )
    }

    /// Changes a line's quantity by a signed delta.
    ///
    /// A line whose quantity would drop to zero or below is removed instead.
    pub fn adjust_item_quantity(
        &mut self,
        product_id: ProductId,
        quantity_delta: i32,
        sequence_number: Version,
    ) -> Result<(), BasketError> {
        self.ensure_created()?;

        let current = self
            .quantity_of(&product_id)
            .ok_or_else(|| BasketError::ItemNotFound {
                product_id: product_id.clone(),
            })?;

        let updated = i64::from(current) + i64::from(quantity_delta);
        let data = if updated <= 0 {
            BasketEventData::ItemRemoved(ItemRemovedData { product_id })
        } else if updated > i64::from(u32::MAX) {
            return Err(BasketError::QuantityOverflow { product_id });
        } else {
            BasketEventData::ItemQuantityAdjusted(ItemQuantityAdjustedData {
                product_id,
                quantity_delta,
            })
        };

        self.record(sequence_number, data)
    }

    /// Replaces the discount code.
    pub fn set_discount_code(
        &mut self,
        code: impl Into<String>,
        sequence_number: Version,
    ) -> Result<(), BasketError> {
        self.ensure_created()?;

        self.record(
            sequence_number,
            BasketEventData::DiscountCodeSet(DiscountCodeSetData { code: code.into() }),
        )
    }

    /// Sets the shipping cost for a country, replacing any previous cost.
    pub fn set_shipping_cost(
        &mut self,
        country_code: impl Into<String>,
        cost: Decimal,
        sequence_number: Version,
    ) -> Result<(), BasketError> {
        self.ensure_created()?;

        if cost < Decimal::ZERO {
            return Err(BasketError::NegativeShippingCost { cost });
        }

        self.record(
            sequence_number,
            BasketEventData::ShippingCostSet(ShippingCostSetData {
                country_code: country_code.into(),
                cost,
            }),
        )
    }

    fn ensure_created(&self) -> Result<(), BasketError> {
        if self.is_created() {
            Ok(())
        } else {
            Err(BasketError::NotCreated)
        }
    }

    fn record(
        &mut self,
        sequence_number: Version,
        data: BasketEventData,
    ) -> Result<(), BasketError> {
        let expected = self.version.next();
        if sequence_number != expected {
            return Err(BasketError::SequenceMismatch {
                expected,
                actual: sequence_number,
            });
        }

        let event = BasketEvent::new(sequence_number, data);
        self.apply(&event);
        self.pending.push(event);
        Ok(())
    }
}

// Event application
impl Basket {
    fn apply_item_added(&mut self, data: &ItemAddedData) {
        match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == data.product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(data.quantity),
            None if data.quantity > 0 => self.lines.push(BasketLine {
                product_id: data.product_id.clone(),
                quantity: data.quantity,
            }),
            None => {}
        }
    }

    fn apply_quantity_delta(&mut self, product_id: &ProductId, delta: i64) {
        let Some(index) = self
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)
        else {
            return;
        };

        let updated = i64::from(self.lines[index].quantity) + delta;
        if updated <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = u32::try_from(updated).unwrap_or(u32::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created_basket() -> Basket {
        let mut basket = Basket::default();
        basket.create(BasketId::new("b1"), Version::first()).unwrap();
        basket
    }

    fn next(basket: &Basket) -> Version {
        basket.version().next()
    }

    #[test]
    fn test_create_basket() {
        let basket = created_basket();

        assert!(basket.is_created());
        assert_eq!(basket.id(), Some(&BasketId::new("b1")));
        assert_eq!(basket.version(), Version::first());
        assert_eq!(basket.pending_events().len(), 1);
        assert_eq!(basket.pending_events()[0].data.event_type(), "BasketCreated");
    }

    #[test]
    fn test_create_twice_fails() {
        let mut basket = created_basket();
        let seq = next(&basket);
        let result = basket.create(BasketId::new("b1"), seq);
        assert!(matches!(result, Err(BasketError::AlreadyCreated)));
    }

    #[test]
    fn test_add_item_merges_existing_line() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 2, next(&basket)).unwrap();
        basket.add_item("prod-2".into(), 1, next(&basket)).unwrap();
        basket.add_item("prod-1".into(), 3, next(&basket)).unwrap();

        assert_eq!(basket.lines().len(), 2);
        assert_eq!(basket.lines()[0].product_id, ProductId::new("prod-1"));
        assert_eq!(basket.quantity_of(&"prod-1".into()), Some(5));
        assert_eq!(basket.version(), Version::new(4));
    }

    #[test]
    fn test_add_zero_quantity_fails() {
        let mut basket = created_basket();
        let result = basket.add_item("prod-1".into(), 0, next(&basket));
        assert!(matches!(result, Err(BasketError::InvalidQuantity { .. })));
        assert_eq!(basket.pending_events().len(), 1);
    }

    #[test]
    fn test_operation_on_absent_basket_fails() {
        let mut basket = Basket::default();
        let result = basket.add_item("prod-1".into(), 1, Version::first());
        assert!(matches!(result, Err(BasketError::NotCreated)));
        assert!(basket.pending_events().is_empty());
    }

    #[test]
    fn test_wrong_sequence_number_records_nothing() {
        let mut basket = created_basket();
        let result = basket.add_item("prod-1".into(), 1, Version::new(5));

        assert!(matches!(
            result,
            Err(BasketError::SequenceMismatch { expected, actual })
                if expected == Version::new(2) && actual == Version::new(5)
        ));
        assert!(basket.lines().is_empty());
        assert_eq!(basket.version(), Version::first());
    }

    #[test]
    fn test_adjust_to_zero_removes_line() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 2, next(&basket)).unwrap();
        basket
            .adjust_item_quantity("prod-1".into(), -2, next(&basket))
            .unwrap();

        assert!(basket.lines().is_empty());
        let last = basket.pending_events().last().unwrap();
        assert!(matches!(last.data, BasketEventData::ItemRemoved(_)));
    }

    #[test]
    fn test_adjust_below_zero_removes_line() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 2, next(&basket)).unwrap();
        basket
            .adjust_item_quantity("prod-1".into(), -10, next(&basket))
            .unwrap();

        assert_eq!(basket.quantity_of(&"prod-1".into()), None);
    }

    #[test]
    fn test_adjust_keeps_positive_line() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 2, next(&basket)).unwrap();
        basket
            .adjust_item_quantity("prod-1".into(), 3, next(&basket))
            .unwrap();
        basket
            .adjust_item_quantity("prod-1".into(), -1, next(&basket))
            .unwrap();

        assert_eq!(basket.quantity_of(&"prod-1".into()), Some(4));
        let last = basket.pending_events().last().unwrap();
        assert!(matches!(
            &last.data,
            BasketEventData::ItemQuantityAdjusted(data) if data.quantity_delta == -1
        ));
    }

    #[test]
    fn test_add_past_max_quantity_fails() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), u32::MAX, next(&basket)).unwrap();

        let result = basket.add_item("prod-1".into(), 1, next(&basket));

        assert!(matches!(result, Err(BasketError::QuantityOverflow { .. })));
        assert_eq!(basket.quantity_of(&"prod-1".into()), Some(u32::MAX));
        assert_eq!(basket.pending_events().len(), 2);
    }

    #[test]
    fn test_adjust_past_max_quantity_fails() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), u32::MAX - 1, next(&basket)).unwrap();

        let result = basket.adjust_item_quantity("prod-1".into(), 2, next(&basket));
        assert!(matches!(result, Err(BasketError::QuantityOverflow { .. })));
        assert_eq!(
            result.unwrap_err().kind(),
            common::FailureKind::ValidationFailure
        );

        basket.adjust_item_quantity("prod-1".into(), 1, next(&basket)).unwrap();
        assert_eq!(basket.quantity_of(&"prod-1".into()), Some(u32::MAX));
    }

    #[test]
    fn test_adjust_unknown_product_fails() {
        let mut basket = created_basket();
        let result = basket.adjust_item_quantity("prod-9".into(), 1, next(&basket));
        assert!(matches!(result, Err(BasketError::ItemNotFound { .. })));
    }

    #[test]
    fn test_discount_code_is_replaced() {
        let mut basket = created_basket();
        basket.set_discount_code("SAVE10", next(&basket)).unwrap();
        basket.set_discount_code("HALF", next(&basket)).unwrap();
        assert_eq!(basket.discount_code(), Some("HALF"));
    }

    #[test]
    fn test_shipping_cost_last_write_wins() {
        let mut basket = created_basket();
        basket
            .set_shipping_cost("GB", Decimal::new(500, 2), next(&basket))
            .unwrap();
        basket
            .set_shipping_cost("FR", Decimal::new(800, 2), next(&basket))
            .unwrap();
        basket
            .set_shipping_cost("GB", Decimal::new(650, 2), next(&basket))
            .unwrap();

        assert_eq!(basket.shipping_costs().len(), 2);
        assert_eq!(basket.shipping_costs()["GB"], Decimal::new(650, 2));
    }

    #[test]
    fn test_negative_shipping_cost_fails() {
        let mut basket = created_basket();
        let result = basket.set_shipping_cost("GB", Decimal::new(-1, 0), next(&basket));
        assert!(matches!(result, Err(BasketError::NegativeShippingCost { .. })));
    }

    #[test]
    fn test_take_and_clear_pending_events() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 1, next(&basket)).unwrap();

        let pending = basket.take_pending_events();
        assert_eq!(pending.len(), 2);
        assert!(basket.pending_events().is_empty());

        basket.add_item("prod-2".into(), 1, next(&basket)).unwrap();
        basket.clear_pending_events();
        assert!(basket.pending_events().is_empty());
        assert_eq!(basket.version(), Version::new(3));
    }

    #[test]
    fn test_hydration_matches_command_state() {
        let mut basket = created_basket();
        basket.add_item("prod-1".into(), 2, next(&basket)).unwrap();
        basket.add_item("prod-2".into(), 1, next(&basket)).unwrap();
        basket
            .adjust_item_quantity("prod-1".into(), -2, next(&basket))
            .unwrap();
        basket.set_discount_code("HALF", next(&basket)).unwrap();
        basket
            .set_shipping_cost("GB", Decimal::new(10, 0), next(&basket))
            .unwrap();

        let mut history = basket.take_pending_events();
        history.reverse();
        let replayed = Basket::hydrate(history);

        assert_eq!(replayed, basket);
    }

    #[test]
    fn test_replay_ignores_adjustments_to_missing_lines() {
        let mut replayed = Basket::hydrate(vec![BasketEvent::new(
            Version::first(),
            BasketEventData::Created(BasketCreatedData {
                basket_id: BasketId::new("b1"),
            }),
        )]);
        replayed.apply(&BasketEvent::new(
            Version::new(2),
            BasketEventData::ItemQuantityAdjusted(ItemQuantityAdjustedData {
                product_id: "ghost".into(),
                quantity_delta: 4,
            }),
        ));

        assert!(replayed.lines().is_empty());
        assert_eq!(replayed.version(), Version::new(2));
    }
}
