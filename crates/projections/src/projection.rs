//! The basket read-model projection.

use std::collections::BTreeMap;

use common::{BasketId, ProductId, StreamId};
use domain::Basket;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product line as it appears in the read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Denormalized, query-ready snapshot of one basket.
///
/// Stored under its stream ID and fully overwritten on every rebuild. It may
/// lag the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketProjection {
    /// Stream ID, the read model key.
    pub id: StreamId,

    pub basket_id: BasketId,

    pub discount_code: Option<String>,

    /// Lines in the order products were first added.
    pub items: Vec<ProjectionItem>,

    pub shipping_costs: BTreeMap<String, Decimal>,
}

impl BasketProjection {
    /// Maps a hydrated basket to its projection.
    ///
    /// Returns None if the basket was never created.
    pub fn from_basket(stream_id: &StreamId, basket: &Basket) -> Option<Self> {
        let basket_id = basket.id()?.clone();

        Some(Self {
            id: stream_id.clone(),
            basket_id,
            discount_code: basket.discount_code().map(str::to_string),
            items: basket
                .lines()
                .iter()
                .map(|line| ProjectionItem {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            shipping_costs: basket.shipping_costs().clone(),
        })
    }

    /// Returns the shipping cost for a country, if one was set.
    pub fn shipping_cost(&self, country_code: &str) -> Option<Decimal> {
        self.shipping_costs.get(country_code).copied()
    }
}
