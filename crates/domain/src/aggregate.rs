//! Core aggregate and domain event traits.

use event_store::{EventEnvelope, NewEvent, Version};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain. They are
/// immutable, named in past tense, and carry their position in the stream.
pub trait DomainEvent: Clone + Send + Sync + Sized {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;

    /// Returns the event's position in its stream.
    fn sequence_number(&self) -> Version;

    /// Converts the event into its storable form.
    ///
    /// The store assigns the final sequence number at append time.
    fn to_new_event(&self) -> Result<NewEvent, serde_json::Error>;

    /// Decodes a stored event.
    fn from_envelope(envelope: &EventEnvelope) -> Result<Self, serde_json::Error>;
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Record new events from commands into a pending buffer
/// - Apply events to update state (pure, deterministic)
///
/// Command application and hydration go through the same [`Aggregate::apply`],
/// so replayed state always matches the state a command produced.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the number of events applied so far.
    fn version(&self) -> Version;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be deterministic and must not fail: events are facts that have
    /// already happened.
    fn apply(&mut self, event: &Self::Event);

    /// Events recorded by the current operation but not yet appended.
    fn pending_events(&self) -> &[Self::Event];

    /// Removes and returns the pending events.
    fn take_pending_events(&mut self) -> Vec<Self::Event>;

    /// Drops the pending events, typically after a successful append.
    fn clear_pending_events(&mut self);

    /// Applies multiple events in sequence.
    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>)
    where
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }

    /// Rebuilds an aggregate by replaying its history.
    ///
    /// Events are ordered by sequence number first, so arrival order never
    /// affects the result.
    fn hydrate(events: impl IntoIterator<Item = Self::Event>) -> Self {
        let mut events: Vec<_> = events.into_iter().collect();
        events.sort_by_key(|e| e.sequence_number());

        let mut aggregate = Self::default();
        aggregate.apply_events(&events);
        aggregate
    }
}
