//! Change notifier: subscribes to a change source and dispatches notifications.

use std::time::Duration;

use async_trait::async_trait;
use common::StreamId;
use event_store::{ChangeSource, NotificationStream, StreamChanged};
use futures_util::StreamExt;
use tokio::sync::watch;

use crate::Result;
use crate::error::NotifierError;

/// Fixed-delay, bounded retry for establishing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts before giving up. Treated as at least 1.
    pub max_attempts: u32,

    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

/// Receives change notifications from a [`ChangeNotifier`].
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handles one notification. Errors are logged by the notifier, which
    /// then moves on to the next notification.
    ///
    /// `shutdown` flips to true when the notifier is asked to stop; handlers
    /// check it between their own I/O calls.
    async fn handle(
        &self,
        changed: &StreamChanged,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<()>;
}

/// A live subscription plus the streams that existed when it was opened.
pub struct Subscription {
    pub notifications: NotificationStream,
    pub backlog: Vec<StreamId>,
}

/// Observes a change source and feeds notifications to a handler.
///
/// Delivery is at-least-once; handlers must be idempotent. Every successful
/// subscribe is followed by one notification per known stream, covering
/// whatever was written while nobody was listening. A lost subscription is
/// re-established through the same bounded retry cycle used at startup.
pub struct ChangeNotifier<C: ChangeSource> {
    source: C,
    policy: RetryPolicy,
}

impl<C: ChangeSource> ChangeNotifier<C> {
    /// Creates a notifier with the given retry policy.
    pub fn new(source: C, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Returns the retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Establishes a subscription, retrying with a fixed delay.
    ///
    /// An attempt succeeds once the source is subscribed and its known
    /// streams are listed; subscribing first means nothing falls between the
    /// two. Returns `Ok(None)` if shutdown is signalled while connecting, and
    /// `NotifierError::Unavailable` once every attempt has failed.
    pub async fn connect(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> std::result::Result<Option<Subscription>, NotifierError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if *shutdown.borrow() {
                return Ok(None);
            }

            metrics::counter!("change_notifier_connect_attempts_total").increment(1);

            match self.subscribe_with_backlog().await {
                Ok(subscription) => {
                    tracing::info!(
                        attempt,
                        backlog = subscription.backlog.len(),
                        "change notifier subscribed"
                    );
                    return Ok(Some(subscription));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "change source unavailable"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.policy.delay) => {}
                    _ = shutdown.changed() => return Ok(None),
                }
            }
        }

        tracing::error!(
            attempts = max_attempts,
            error = %last_error,
            "giving up on change source"
        );
        Err(NotifierError::Unavailable {
            attempts: max_attempts,
            last_error,
        })
    }

    async fn subscribe_with_backlog(&self) -> event_store::Result<Subscription> {
        let notifications = self.source.subscribe().await?;
        let backlog = self.source.known_streams().await?;
        Ok(Subscription {
            notifications,
            backlog,
        })
    }

    /// Runs the notification loop until shutdown.
    ///
    /// After each (re)subscribe the backlog is handled first, then live
    /// notifications one at a time in arrival order.
    pub async fn run<H: NotificationHandler + ?Sized>(
        &self,
        handler: &H,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::result::Result<(), NotifierError> {
        loop {
            let Some(subscription) = self.connect(&mut shutdown).await? else {
                tracing::info!("change notifier stopped during connect");
                return Ok(());
            };
            let mut notifications = subscription.notifications;

            for stream_id in subscription.backlog {
                if *shutdown.borrow() {
                    tracing::info!("change notifier stopped during catch-up");
                    return Ok(());
                }
                dispatch(handler, &StreamChanged::new(stream_id), &shutdown).await;
            }

            loop {
                if *shutdown.borrow() {
                    tracing::info!("change notifier stopped");
                    return Ok(());
                }

                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        tracing::info!("change notifier stopped");
                        return Ok(());
                    }
                    next = notifications.next() => match next {
                        Some(Ok(changed)) => dispatch(handler, &changed, &shutdown).await,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "subscription failed, reconnecting");
                            break;
                        }
                        None => {
                            tracing::warn!("subscription ended, reconnecting");
                            break;
                        }
                    },
                }
            }
        }
    }
}

async fn dispatch<H: NotificationHandler + ?Sized>(
    handler: &H,
    changed: &StreamChanged,
    shutdown: &watch::Receiver<bool>,
) {
    if let Err(e) = handler.handle(changed, shutdown).await {
        tracing::error!(
            stream_id = %changed.stream_id,
            error = %e,
            "failed to handle change notification"
        );
    }
}
