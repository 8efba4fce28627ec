pub mod error;
pub mod event;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod store;

pub use common::StreamId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, NewEvent, NewEventBuilder, Version};
pub use memory::InMemoryEventStore;
pub use notify::{ChangeSource, NotificationStream, StreamChanged};
pub use postgres::{PostgresChangeSource, PostgresEventStore};
pub use store::{EventStore, EventStoreExt};
