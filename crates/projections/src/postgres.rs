//! PostgreSQL-backed read model store.

use async_trait::async_trait;
use common::StreamId;
use sqlx::PgPool;

use crate::Result;
use crate::projection::BasketProjection;
use crate::read_model::ReadModelStore;

/// Read model store over the `basket_read_models` table.
///
/// Each projection is kept as a JSONB document keyed by stream ID.
#[derive(Clone)]
pub struct PostgresReadModelStore {
    pool: PgPool,
}

impl PostgresReadModelStore {
    /// Creates a new PostgreSQL read model store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ReadModelStore for PostgresReadModelStore {
    fn name(&self) -> &'static str {
        "PostgresReadModelStore"
    }

    async fn get_projection(&self, stream_id: &StreamId) -> Result<Option<BasketProjection>> {
        let document: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM basket_read_models WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        document
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .transpose()
    }

    async fn save_projection(&self, projection: &BasketProjection) -> Result<()> {
        let document = serde_json::to_value(projection)?;

        sqlx::query(
            r#"
            INSERT INTO basket_read_models (stream_id, document, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (stream_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(projection.id.as_str())
        .bind(&document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
