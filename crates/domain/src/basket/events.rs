//! Basket domain events.

use chrono::{DateTime, Utc};
use common::{BasketId, ProductId};
use event_store::{EventEnvelope, EventId, NewEvent, Version};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// A fact recorded against a basket, with its position in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketEvent {
    /// Position of the event in the basket's stream, starting at 1.
    pub sequence_number: Version,

    /// When the event happened.
    pub occurred_at: DateTime<Utc>,

    /// What happened.
    pub data: BasketEventData,
}

impl BasketEvent {
    /// Creates an event stamped with the current time.
    pub fn new(sequence_number: Version, data: BasketEventData) -> Self {
        Self {
            sequence_number,
            occurred_at: Utc::now(),
            data,
        }
    }
}

/// The closed set of things that can happen to a basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BasketEventData {
    /// The basket was created.
    Created(BasketCreatedData),

    /// A quantity of a product was added.
    ItemAdded(ItemAddedData),

    /// A line's quantity changed but stayed positive.
    ItemQuantityAdjusted(ItemQuantityAdjustedData),

    /// A line was removed because its quantity dropped to zero or below.
    ItemRemoved(ItemRemovedData),

    /// A discount code was applied.
    DiscountCodeSet(DiscountCodeSetData),

    /// The shipping cost for a country was set.
    ShippingCostSet(ShippingCostSetData),
}

impl BasketEventData {
    /// Returns the event type name stored alongside the payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            BasketEventData::Created(_) => "BasketCreated",
            BasketEventData::ItemAdded(_) => "BasketItemAdded",
            BasketEventData::ItemQuantityAdjusted(_) => "BasketItemQuantityAdjusted",
            BasketEventData::ItemRemoved(_) => "BasketItemRemoved",
            BasketEventData::DiscountCodeSet(_) => "BasketDiscountCodeSet",
            BasketEventData::ShippingCostSet(_) => "BasketShippingCostSet",
        }
    }
}

impl DomainEvent for BasketEvent {
    fn event_type(&self) -> &'static str {
        self.data.event_type()
    }

    fn sequence_number(&self) -> Version {
        self.sequence_number
    }

    fn to_new_event(&self) -> Result<NewEvent, serde_json::Error> {
        Ok(NewEvent {
            event_id: EventId::new(),
            event_type: self.event_type().to_string(),
            occurred_at: self.occurred_at,
            payload: serde_json::to_value(&self.data)?,
        })
    }

    fn from_envelope(envelope: &EventEnvelope) -> Result<Self, serde_json::Error> {
        Ok(Self {
            sequence_number: envelope.sequence_number,
            occurred_at: envelope.occurred_at,
            data: serde_json::from_value(envelope.payload.clone())?,
        })
    }
}

/// Data for the Created event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketCreatedData {
    /// The basket that was created.
    pub basket_id: BasketId,
}

/// Data for the ItemAdded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Data for the ItemQuantityAdjusted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuantityAdjustedData {
    pub product_id: ProductId,

    /// Signed change applied to the line's quantity.
    pub quantity_delta: i32,
}

/// Data for the ItemRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub product_id: ProductId,
}

/// Data for the DiscountCodeSet event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCodeSetData {
    pub code: String,
}

/// Data for the ShippingCostSet event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCostSetData {
    pub country_code: String,
    pub cost: Decimal,
}
