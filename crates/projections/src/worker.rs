//! Projection worker: rebuilds basket read models from their full history.

use std::time::Instant;

use async_trait::async_trait;
use common::StreamId;
use domain::{Basket, CommandHandler};
use event_store::{ChangeSource, EventStore, StreamChanged};
use tokio::sync::watch;

use crate::Result;
use crate::error::NotifierError;
use crate::notifier::{ChangeNotifier, NotificationHandler};
use crate::projection::BasketProjection;
use crate::read_model::ReadModelStore;

/// Rebuilds a basket's projection whenever its stream changes.
///
/// Every rebuild replays the entire stream; there is no snapshotting and no
/// incremental patching, so handling the same notification twice stores the
/// same record.
pub struct ProjectionWorker<S: EventStore, R: ReadModelStore> {
    loader: CommandHandler<S, Basket>,
    read_models: R,
}

impl<S: EventStore, R: ReadModelStore> ProjectionWorker<S, R> {
    /// Creates a worker over an event store and a read model store.
    pub fn new(store: S, read_models: R) -> Self {
        Self {
            loader: CommandHandler::new(store),
            read_models,
        }
    }

    /// Returns a reference to the read model store.
    pub fn read_models(&self) -> &R {
        &self.read_models
    }

    /// Replays a stream and upserts its projection.
    ///
    /// Returns the stored projection, or None if the stream holds no basket.
    pub async fn rebuild(&self, stream_id: &StreamId) -> Result<Option<BasketProjection>> {
        self.rebuild_until(stream_id, None).await
    }

    /// Like [`rebuild`](Self::rebuild), but abandons the rebuild without
    /// saving if `shutdown` flips to true once the history is loaded.
    pub async fn rebuild_unless_stopped(
        &self,
        stream_id: &StreamId,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<Option<BasketProjection>> {
        self.rebuild_until(stream_id, Some(shutdown)).await
    }

    #[tracing::instrument(skip(self, shutdown), fields(stream_id = %stream_id))]
    async fn rebuild_until(
        &self,
        stream_id: &StreamId,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<Option<BasketProjection>> {
        let started = Instant::now();
        let stopped = || shutdown.is_some_and(|rx| *rx.borrow());

        let Some(basket) = self.loader.load_existing(stream_id).await? else {
            tracing::info!("no events for stream, skipping");
            return Ok(None);
        };

        let Some(projection) = BasketProjection::from_basket(stream_id, &basket) else {
            tracing::warn!("stream has events but no basket was created, skipping");
            return Ok(None);
        };

        if stopped() {
            tracing::info!("shutdown requested, projection not saved");
            return Ok(None);
        }

        self.read_models.save_projection(&projection).await?;

        metrics::counter!("projections_rebuilt_total").increment(1);
        metrics::histogram!("projection_rebuild_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(items = projection.items.len(), "projection rebuilt");

        Ok(Some(projection))
    }

    /// Consumes notifications from the notifier until shutdown.
    ///
    /// Fails only if the change source cannot be reached within the
    /// notifier's retry policy.
    pub async fn run<C: ChangeSource>(
        &self,
        notifier: &ChangeNotifier<C>,
        shutdown: watch::Receiver<bool>,
    ) -> std::result::Result<(), NotifierError> {
        tracing::info!(read_model = self.read_models.name(), "projection worker starting");
        notifier.run(self, shutdown).await
    }
}

#[async_trait]
impl<S: EventStore, R: ReadModelStore> NotificationHandler for ProjectionWorker<S, R> {
    async fn handle(
        &self,
        changed: &StreamChanged,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<()> {
        match self.rebuild_unless_stopped(&changed.stream_id, shutdown).await {
            Ok(_) => Ok(()),
            Err(e) => {
                metrics::counter!("projection_rebuild_failures_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadModelStore;
    use common::BasketId;
    use domain::{AddItems, AdjustItemQuantity, BasketService, ItemToAdd, SetShippingCost};
    use event_store::{EventStoreExt, InMemoryEventStore, NewEvent, Version};
    use rust_decimal::Decimal;

    fn setup() -> (
        BasketService<InMemoryEventStore>,
        ProjectionWorker<InMemoryEventStore, InMemoryReadModelStore>,
        InMemoryReadModelStore,
    ) {
        let store = InMemoryEventStore::new();
        let read_models = InMemoryReadModelStore::new();
        (
            BasketService::new(store.clone()),
            ProjectionWorker::new(store, read_models.clone()),
            read_models,
        )
    }

    fn stream(basket_id: &str) -> StreamId {
        BasketId::new(basket_id).stream_id()
    }

    #[tokio::test]
    async fn rebuild_stores_current_state() {
        let (service, worker, read_models) = setup();
        service
            .add_items(AddItems::new(
                "b1",
                vec![ItemToAdd::new("prod-1", 2), ItemToAdd::new("prod-2", 1)],
            ))
            .await
            .unwrap();
        service
            .adjust_item_quantity(AdjustItemQuantity::new("b1", "prod-1", -2))
            .await
            .unwrap();

        worker.rebuild(&stream("b1")).await.unwrap();

        let projection = read_models
            .get_projection(&stream("b1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.basket_id, BasketId::new("b1"));
        assert_eq!(projection.items.len(), 1);
        assert_eq!(projection.items[0].product_id.as_str(), "prod-2");
    }

    #[tokio::test]
    async fn rebuild_twice_is_byte_identical() {
        let (service, worker, read_models) = setup();
        service
            .add_items(AddItems::single("b1", "prod-1", 2))
            .await
            .unwrap();
        for (country, cost) in [("GB", 5), ("FR", 8), ("DE", 7)] {
            service
                .set_shipping_cost(SetShippingCost::new("b1", country, Decimal::new(cost, 0)))
                .await
                .unwrap();
        }

        worker.rebuild(&stream("b1")).await.unwrap();
        let first = serde_json::to_vec(&read_models.document(&stream("b1")).await).unwrap();

        worker.rebuild(&stream("b1")).await.unwrap();
        let second = serde_json::to_vec(&read_models.document(&stream("b1")).await).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn duplicate_notification_produces_same_projection() {
        let (service, worker, read_models) = setup();
        service
            .add_items(AddItems::single("b1", "prod-1", 2))
            .await
            .unwrap();

        let changed = StreamChanged::new(stream("b1"));
        let (_tx, running) = watch::channel(false);
        worker.handle(&changed, &running).await.unwrap();
        let first = read_models.get_projection(&stream("b1")).await.unwrap();
        worker.handle(&changed, &running).await.unwrap();
        let second = read_models.get_projection(&stream("b1")).await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(read_models.count().await, 1);
    }

    #[tokio::test]
    async fn unknown_stream_is_skipped() {
        let (_service, worker, read_models) = setup();

        let result = worker.rebuild(&stream("nope")).await.unwrap();

        assert!(result.is_none());
        assert_eq!(read_models.count().await, 0);
    }

    #[tokio::test]
    async fn undecodable_event_fails_the_rebuild() {
        let store = InMemoryEventStore::new();
        let read_models = InMemoryReadModelStore::new();
        let worker = ProjectionWorker::new(store.clone(), read_models.clone());

        let garbage = NewEvent::builder()
            .event_type("BasketCreated")
            .payload_raw(serde_json::json!({"unexpected": true}))
            .try_build()
            .unwrap();
        store
            .append_event(&stream("b1"), garbage, Version::initial())
            .await
            .unwrap();

        let (_tx, running) = watch::channel(false);
        let result = worker
            .handle(&StreamChanged::new(stream("b1")), &running)
            .await;

        assert!(result.is_err());
        assert_eq!(read_models.count().await, 0);
    }

    /// Event store that signals shutdown as soon as a stream is loaded.
    struct StopsAfterLoad {
        inner: InMemoryEventStore,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl EventStore for StopsAfterLoad {
        async fn load_events(
            &self,
            stream_id: &StreamId,
        ) -> event_store::Result<Vec<event_store::EventEnvelope>> {
            let events = self.inner.load_events(stream_id).await?;
            self.shutdown.send_replace(true);
            Ok(events)
        }

        async fn append_events(
            &self,
            stream_id: &StreamId,
            events: Vec<NewEvent>,
            expected: Version,
        ) -> event_store::Result<Version> {
            self.inner.append_events(stream_id, events, expected).await
        }

        async fn stream_version(&self, stream_id: &StreamId) -> event_store::Result<Version> {
            self.inner.stream_version(stream_id).await
        }
    }

    #[tokio::test]
    async fn shutdown_during_rebuild_skips_the_save() {
        let inner = InMemoryEventStore::new();
        BasketService::new(inner.clone())
            .add_items(AddItems::single("b1", "prod-1", 1))
            .await
            .unwrap();

        let (shutdown, rx) = watch::channel(false);
        let read_models = InMemoryReadModelStore::new();
        let worker = ProjectionWorker::new(StopsAfterLoad { inner, shutdown }, read_models.clone());

        worker
            .handle(&StreamChanged::new(stream("b1")), &rx)
            .await
            .unwrap();

        assert_eq!(read_models.count().await, 0);
    }

    #[tokio::test]
    async fn rebuild_without_shutdown_signal_always_saves() {
        let inner = InMemoryEventStore::new();
        BasketService::new(inner.clone())
            .add_items(AddItems::single("b1", "prod-1", 1))
            .await
            .unwrap();

        let (shutdown, _rx) = watch::channel(false);
        let read_models = InMemoryReadModelStore::new();
        let worker = ProjectionWorker::new(StopsAfterLoad { inner, shutdown }, read_models.clone());

        assert!(worker.rebuild(&stream("b1")).await.unwrap().is_some());
        assert_eq!(read_models.count().await, 1);
    }
}
