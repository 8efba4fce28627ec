//! Change notifications emitted when a stream receives new events.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::{Result, StreamId};

/// "This stream has new events." Carries no payload.
///
/// Delivery is at-least-once: consumers must tolerate duplicates and
/// out-of-order arrival.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamChanged {
    pub stream_id: StreamId,
}

impl StreamChanged {
    pub fn new(stream_id: StreamId) -> Self {
        Self { stream_id }
    }
}

/// A stream of change notifications.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Result<StreamChanged>> + Send>>;

/// Something that can be subscribed to for change notifications.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Establishes a subscription.
    ///
    /// Fails if the underlying source is unreachable; callers decide whether
    /// to retry. The returned stream ends when the subscription is lost.
    async fn subscribe(&self) -> Result<NotificationStream>;

    /// Lists every stream that holds at least one event.
    ///
    /// Subscribers replay this after subscribing, since anything published
    /// while they were not listening is gone.
    async fn known_streams(&self) -> Result<Vec<StreamId>>;
}

#[async_trait]
impl<T: ChangeSource + ?Sized> ChangeSource for Arc<T> {
    async fn subscribe(&self) -> Result<NotificationStream> {
        (**self).subscribe().await
    }

    async fn known_streams(&self) -> Result<Vec<StreamId>> {
        (**self).known_streams().await
    }
}
