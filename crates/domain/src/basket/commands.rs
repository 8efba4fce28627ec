//! Basket commands.

use common::{BasketId, ProductId, StreamId};
use rust_decimal::Decimal;

use crate::command::Command;

use super::Basket;

/// Command to create an empty basket.
#[derive(Debug, Clone)]
pub struct CreateBasket {
    pub basket_id: BasketId,
}

impl CreateBasket {
    /// Creates a new CreateBasket command.
    pub fn new(basket_id: impl Into<BasketId>) -> Self {
        Self {
            basket_id: basket_id.into(),
        }
    }
}

impl Command for CreateBasket {
    type Aggregate = Basket;

    fn name(&self) -> &'static str {
        "create_basket"
    }

    fn stream_id(&self) -> StreamId {
        self.basket_id.stream_id()
    }
}

/// One line of an [`AddItems`] command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemToAdd {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ItemToAdd {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to add items to a basket, creating the basket if needed.
#[derive(Debug, Clone)]
pub struct AddItems {
    /// The basket to add the items to.
    pub basket_id: BasketId,

    /// Items to add, in order.
    pub items: Vec<ItemToAdd>,
}

impl AddItems {
    /// Creates a new AddItems command.
    pub fn new(basket_id: impl Into<BasketId>, items: Vec<ItemToAdd>) -> Self {
        Self {
            basket_id: basket_id.into(),
            items,
        }
    }

    /// Creates an AddItems command for a single product.
    pub fn single(
        basket_id: impl Into<BasketId>,
        product_id: impl Into<ProductId>,
        quantity: u32,
    ) -> Self {
        Self::new(basket_id, vec![ItemToAdd::new(product_id, quantity)])
    }
}

impl Command for AddItems {
    type Aggregate = Basket;

    fn name(&self) -> &'static str {
        "add_items"
    }

    fn stream_id(&self) -> StreamId {
        self.basket_id.stream_id()
    }
}

/// Command to change the quantity of a basket line.
#[derive(Debug, Clone)]
pub struct AdjustItemQuantity {
    pub basket_id: BasketId,
    pub product_id: ProductId,

    /// Signed change; a result of zero or less removes the line.
    pub quantity_delta: i32,
}

impl AdjustItemQuantity {
    /// Creates a new AdjustItemQuantity command.
    pub fn new(
        basket_id: impl Into<BasketId>,
        product_id: impl Into<ProductId>,
        quantity_delta: i32,
    ) -> Self {
        Self {
            basket_id: basket_id.into(),
            product_id: product_id.into(),
            quantity_delta,
        }
    }
}

impl Command for AdjustItemQuantity {
    type Aggregate = Basket;

    fn name(&self) -> &'static str {
        "adjust_item_quantity"
    }

    fn stream_id(&self) -> StreamId {
        self.basket_id.stream_id()
    }
}

/// Command to apply a discount code.
#[derive(Debug, Clone)]
pub struct SetDiscountCode {
    pub basket_id: BasketId,
    pub code: String,
}

impl SetDiscountCode {
    /// Creates a new SetDiscountCode command.
    pub fn new(basket_id: impl Into<BasketId>, code: impl Into<String>) -> Self {
        Self {
            basket_id: basket_id.into(),
            code: code.into(),
        }
    }
}

impl Command for SetDiscountCode {
    type Aggregate = Basket;

    fn name(&self) -> &'static str {
        "set_discount_code"
    }

    fn stream_id(&self) -> StreamId {
        self.basket_id.stream_id()
    }
}

/// Command to set the shipping cost for a destination country.
#[derive(Debug, Clone)]
pub struct SetShippingCost {
    pub basket_id: BasketId,
    pub country_code: String,
    pub cost: Decimal,
}

impl SetShippingCost {
    /// Creates a new SetShippingCost command.
    pub fn new(
        basket_id: impl Into<BasketId>,
        country_code: impl Into<String>,
        cost: Decimal,
    ) -> Self {
        Self {
            basket_id: basket_id.into(),
            country_code: country_code.into(),
            cost,
        }
    }
}

impl Command for SetShippingCost {
    type Aggregate = Basket;

    fn name(&self) -> &'static str {
        "set_shipping_cost"
    }

    fn stream_id(&self) -> StreamId {
        self.basket_id.stream_id()
    }
}
