use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{RwLock, broadcast};

use crate::{
    EventEnvelope, NewEvent, Result, StreamId, Version,
    notify::{ChangeSource, NotificationStream, StreamChanged},
    store::{EventStore, stamp_events},
};

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// In-memory event store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation, and doubles
/// as a [`ChangeSource`]: every appended event is announced on a broadcast
/// channel.
#[derive(Clone)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamId, Vec<EventEnvelope>>>>,
    changes: broadcast::Sender<StreamChanged>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Returns the number of streams that have at least one event.
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Clears all streams.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events(&self, stream_id: &StreamId) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        let mut events = streams.get(stream_id).cloned().unwrap_or_default();
        events.sort_by_key(|e| e.sequence_number);
        Ok(events)
    }

    async fn append_events(
        &self,
        stream_id: &StreamId,
        events: Vec<NewEvent>,
        expected: Version,
    ) -> Result<Version> {
        let mut streams = self.streams.write().await;

        // Check and write under one lock so the batch lands all-or-nothing.
        let actual = Version::from_count(streams.get(stream_id).map_or(0, Vec::len));
        let stamped = stamp_events(stream_id, events, expected, actual)?;
        let appended = stamped.len();

        let stream = streams.entry(stream_id.clone()).or_default();
        stream.extend(stamped);
        let new_version = Version::from_count(stream.len());
        drop(streams);

        for _ in 0..appended {
            // No receivers is fine; nobody is listening yet.
            let _ = self.changes.send(StreamChanged::new(stream_id.clone()));
        }

        Ok(new_version)
    }

    async fn stream_version(&self, stream_id: &StreamId) -> Result<Version> {
        let streams = self.streams.read().await;
        Ok(Version::from_count(streams.get(stream_id).map_or(0, Vec::len)))
    }
}

#[async_trait]
impl ChangeSource for InMemoryEventStore {
    async fn subscribe(&self) -> Result<NotificationStream> {
        let receiver = self.changes.subscribe();
        let streams = Arc::clone(&self.streams);

        // A lagged receiver has lost notifications it cannot get back, so it
        // re-announces every stream instead.
        let state = (receiver, streams, VecDeque::<StreamId>::new());
        let notifications = stream::unfold(state, |state| async move {
            let (mut receiver, streams, mut pending) = state;
            loop {
                if let Some(stream_id) = pending.pop_front() {
                    let changed = StreamChanged::new(stream_id);
                    return Some((Ok(changed), (receiver, streams, pending)));
                }

                match receiver.recv().await {
                    Ok(changed) => return Some((Ok(changed), (receiver, streams, pending))),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change subscriber lagged, replaying all streams");
                        pending.extend(sorted_keys(&*streams.read().await));
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(notifications))
    }

    async fn known_streams(&self) -> Result<Vec<StreamId>> {
        Ok(sorted_keys(&*self.streams.read().await))
    }
}

fn sorted_keys(streams: &HashMap<StreamId, Vec<EventEnvelope>>) -> Vec<StreamId> {
    let mut keys: Vec<_> = streams.keys().cloned().collect();
    keys.sort();
    keys
}
