use serde::{Deserialize, Serialize};

/// Prefix shared by every basket event stream.
pub const BASKET_STREAM_PREFIX: &str = "basket-";

/// Identifier of a basket, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasketId(String);

impl BasketId {
    /// Creates a basket ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the basket ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ID of the event stream that holds this basket's history.
    pub fn stream_id(&self) -> StreamId {
        StreamId::for_basket(self)
    }
}

impl std::fmt::Display for BasketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BasketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BasketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an event stream.
///
/// One stream exists per basket, keyed `"basket-" + basket_id`. The stream ID
/// is also the partition key of the event store and the key of the read model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Wraps a raw stream ID, e.g. one received in a change notification.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the stream ID for a basket.
    pub fn for_basket(basket_id: &BasketId) -> Self {
        Self(format!("{BASKET_STREAM_PREFIX}{basket_id}"))
    }

    /// Returns the basket ID encoded in this stream ID, if it is a basket stream.
    pub fn basket_id(&self) -> Option<BasketId> {
        self.0.strip_prefix(BASKET_STREAM_PREFIX).map(BasketId::new)
    }

    /// Returns the stream ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
