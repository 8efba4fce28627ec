//! Command handling infrastructure.

use std::marker::PhantomData;

use common::StreamId;
use event_store::{EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The stream version after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Short name used as a log field and metric label.
    fn name(&self) -> &'static str;

    /// Returns the stream of the aggregate this command targets.
    fn stream_id(&self) -> StreamId;
}

/// Handler for executing commands against aggregates.
///
/// Each execution is stateless:
/// 1. Load the full stream and hydrate a fresh aggregate
/// 2. Let the command record pending events, numbered after the loaded count
/// 3. Append the pending events with the loaded count as the concurrency token
/// 4. Clear the pending events on success
///
/// Nothing is cached between executions.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the stream has no events, returns a default instance.
    pub async fn load(&self, stream_id: &StreamId) -> Result<A, DomainError> {
        let envelopes = self.store.load_events(stream_id).await?;

        let events = envelopes
            .iter()
            .map(<A::Event as DomainEvent>::from_envelope)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(A::hydrate(events))
    }

    /// Loads an aggregate, returning None if its stream has no events.
    pub async fn load_existing(&self, stream_id: &StreamId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(stream_id).await?;
        if aggregate.version() > Version::initial() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the hydrated aggregate and the number of
    /// events already in the stream. New events must be numbered from that
    /// count plus one.
    pub async fn execute<F>(
        &self,
        stream_id: &StreamId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&mut A, Version) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(stream_id).await?;
        let expected = aggregate.version();

        command_fn(&mut aggregate, expected)?;

        if aggregate.pending_events().is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: expected,
            });
        }

        let new_events = aggregate
            .pending_events()
            .iter()
            .map(DomainEvent::to_new_event)
            .collect::<Result<Vec<_>, _>>()?;

        let new_version = self
            .store
            .append_events(stream_id, new_events, expected)
            .await?;

        let events = aggregate.take_pending_events();

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}
