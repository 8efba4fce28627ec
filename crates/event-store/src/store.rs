use std::sync::Arc;

use async_trait::async_trait;

use crate::{EventEnvelope, EventStoreError, NewEvent, Result, StreamId, Version};

/// Core trait for event store implementations.
///
/// An event store keeps one append-only stream per basket. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Retrieves every event of a stream, ordered by sequence number.
    ///
    /// Returns an empty list if the stream has never been written.
    async fn load_events(&self, stream_id: &StreamId) -> Result<Vec<EventEnvelope>>;

    /// Appends events to a stream.
    ///
    /// `expected` is the number of events the caller saw when it loaded the
    /// stream. If the stream's actual count differs, nothing is written and
    /// `ConcurrencyConflict` is returned. Sequence numbers are assigned
    /// contiguously from `expected + 1`, and the batch is written
    /// all-or-nothing.
    ///
    /// Returns the stream version after the append.
    async fn append_events(
        &self,
        stream_id: &StreamId,
        events: Vec<NewEvent>,
        expected: Version,
    ) -> Result<Version>;

    /// Returns the number of events in a stream (0 if it doesn't exist).
    async fn stream_version(&self, stream_id: &StreamId) -> Result<Version>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn load_events(&self, stream_id: &StreamId) -> Result<Vec<EventEnvelope>> {
        (**self).load_events(stream_id).await
    }

    async fn append_events(
        &self,
        stream_id: &StreamId,
        events: Vec<NewEvent>,
        expected: Version,
    ) -> Result<Version> {
        (**self).append_events(stream_id, events, expected).await
    }

    async fn stream_version(&self, stream_id: &StreamId) -> Result<Version> {
        (**self).stream_version(stream_id).await
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event to a stream.
    async fn append_event(
        &self,
        stream_id: &StreamId,
        event: NewEvent,
        expected: Version,
    ) -> Result<Version> {
        self.append_events(stream_id, vec![event], expected).await
    }

    /// Checks if a stream exists (has any events).
    async fn stream_exists(&self, stream_id: &StreamId) -> Result<bool> {
        Ok(self.stream_version(stream_id).await? > Version::initial())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks the optimistic concurrency token and stamps sequence numbers.
///
/// Shared by the store implementations so they agree on numbering.
pub(crate) fn stamp_events(
    stream_id: &StreamId,
    events: Vec<NewEvent>,
    expected: Version,
    actual: Version,
) -> Result<Vec<EventEnvelope>> {
    if events.is_empty() {
        return Err(EventStoreError::EmptyAppend(stream_id.clone()));
    }

    if actual != expected {
        metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
        return Err(EventStoreError::ConcurrencyConflict {
            stream_id: stream_id.clone(),
            expected,
            actual,
        });
    }

    let mut sequence_number = expected;
    Ok(events
        .into_iter()
        .map(|event| {
            sequence_number = sequence_number.next();
            event.into_envelope(stream_id.clone(), sequence_number)
        })
        .collect())
}
