use async_trait::async_trait;
use futures_util::stream;
use sqlx::{PgPool, Row, postgres::PgListener, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, EventStoreError, NewEvent, Result, StreamId, Version,
    notify::{ChangeSource, NotificationStream, StreamChanged},
    store::{EventStore, stamp_events},
};

/// Channel the `basket_events` insert trigger notifies on.
pub const BASKET_EVENTS_CHANNEL: &str = "basket_events";

const UNIQUE_STREAM_SEQUENCE: &str = "unique_stream_sequence";

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations (event log and read model tables).
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            stream_id: StreamId::new(row.try_get::<String, _>("stream_id")?),
            event_type: row.try_get("event_type")?,
            sequence_number: Version::new(row.try_get("sequence_number")?),
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn load_events(&self, stream_id: &StreamId) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, stream_id, event_type, sequence_number, occurred_at, payload
            FROM basket_events
            WHERE stream_id = $1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(stream_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn append_events(
        &self,
        stream_id: &StreamId,
        events: Vec<NewEvent>,
        expected: Version,
    ) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        // The pre-check saves a round of failed inserts; the unique constraint
        // is what actually serializes concurrent writers.
        let actual: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM basket_events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&mut *tx)
                .await?;

        let stamped = stamp_events(stream_id, events, expected, Version::new(actual))?;

        let mut last_version = expected;
        for event in &stamped {
            sqlx::query(
                r#"
                INSERT INTO basket_events (event_id, stream_id, event_type, sequence_number, occurred_at, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(event.stream_id.as_str())
            .bind(&event.event_type)
            .bind(event.sequence_number.as_i64())
            .bind(event.occurred_at)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some(UNIQUE_STREAM_SEQUENCE)
                {
                    metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
                    return EventStoreError::ConcurrencyConflict {
                        stream_id: stream_id.clone(),
                        expected,
                        actual: event.sequence_number,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.sequence_number;
        }

        tx.commit().await?;
        Ok(last_version)
    }

    async fn stream_version(&self, stream_id: &StreamId) -> Result<Version> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM basket_events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(Version::new(count))
    }
}

/// Change source backed by PostgreSQL `LISTEN/NOTIFY`.
///
/// An `AFTER INSERT` trigger on `basket_events` publishes the stream ID of
/// every committed event on [`BASKET_EVENTS_CHANNEL`].
#[derive(Clone)]
pub struct PostgresChangeSource {
    pool: PgPool,
    channel: String,
}

impl PostgresChangeSource {
    /// Creates a change source listening on the default channel.
    pub fn new(pool: PgPool) -> Self {
        Self::with_channel(pool, BASKET_EVENTS_CHANNEL)
    }

    /// Creates a change source listening on a custom channel.
    pub fn with_channel(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl ChangeSource for PostgresChangeSource {
    async fn subscribe(&self) -> Result<NotificationStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| EventStoreError::ChangeSourceUnavailable(e.to_string()))?;

        listener
            .listen(&self.channel)
            .await
            .map_err(|e| EventStoreError::ChangeSourceUnavailable(e.to_string()))?;

        tracing::info!(channel = %self.channel, "listening for basket event notifications");

        // `try_recv` yields `None` when the connection drops; sqlx would
        // reconnect silently and lose whatever was sent in between, so the
        // stream ends instead and the subscriber resubscribes and catches up.
        let notifications = stream::unfold(listener, |mut listener| async move {
            match listener.try_recv().await {
                Ok(Some(notification)) => Some((
                    Ok(StreamChanged::new(StreamId::new(notification.payload()))),
                    listener,
                )),
                Ok(None) => {
                    tracing::warn!("notification connection lost");
                    None
                }
                Err(e) => Some((Err(EventStoreError::Database(e)), listener)),
            }
        });

        Ok(Box::pin(notifications))
    }

    async fn known_streams(&self) -> Result<Vec<StreamId>> {
        let stream_ids: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT stream_id FROM basket_events ORDER BY stream_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(stream_ids.into_iter().map(StreamId::new).collect())
    }
}
