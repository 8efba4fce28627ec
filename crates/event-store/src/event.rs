use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StreamId;

/// Unique identifier for a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event within its stream, and the length of a stream.
///
/// The first event of a stream has sequence number 1; an empty stream is at
/// version 0. After appending the event with sequence number `n`, the stream's
/// version (its event count) is `n`, which is the value the next writer must
/// pass as its expected count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version (0) of a stream that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the sequence number (1) of the first event in a stream.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Converts an event count into a version.
    pub fn from_count(count: usize) -> Self {
        Self(count as i64)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// An event as it is stored: the domain payload plus its stream position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The stream this event belongs to.
    pub stream_id: StreamId,

    /// The type of the event (e.g., "BasketCreated", "BasketItemAdded").
    pub event_type: String,

    /// Position of the event in its stream, starting at 1.
    pub sequence_number: Version,

    /// When the event happened.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

/// An event waiting to be appended.
///
/// Sequence numbers are assigned by the store at append time, contiguously
/// after the expected stream version.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Unique identifier the stored event will carry.
    pub event_id: EventId,

    /// The type of the event.
    pub event_type: String,

    /// When the event happened.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl NewEvent {
    /// Creates a new event builder.
    pub fn builder() -> NewEventBuilder {
        NewEventBuilder::default()
    }

    /// Stamps the event with its stream position, producing the stored form.
    pub fn into_envelope(self, stream_id: StreamId, sequence_number: Version) -> EventEnvelope {
        EventEnvelope {
            event_id: self.event_id,
            stream_id,
            event_type: self.event_type,
            sequence_number,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// Builder for constructing new events.
#[derive(Debug, Default)]
pub struct NewEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl NewEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the time the event happened. If not set, the current time is used.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the event, returning None if the type or payload is missing.
    pub fn try_build(self) -> Option<NewEvent> {
        Some(NewEvent {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type?,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            payload: self.payload?,
        })
    }
}
