//! Read model stores for basket projections.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::StreamId;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::BasketProjection;

/// Query-side storage for basket projections, one record per stream.
///
/// Saving is an idempotent upsert: the stored record is replaced wholesale.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Returns the name of this read model store.
    fn name(&self) -> &'static str;

    /// Gets the projection stored under a stream ID.
    async fn get_projection(&self, stream_id: &StreamId) -> Result<Option<BasketProjection>>;

    /// Inserts or replaces a projection.
    async fn save_projection(&self, projection: &BasketProjection) -> Result<()>;
}

#[async_trait]
impl<T: ReadModelStore + ?Sized> ReadModelStore for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get_projection(&self, stream_id: &StreamId) -> Result<Option<BasketProjection>> {
        (**self).get_projection(stream_id).await
    }

    async fn save_projection(&self, projection: &BasketProjection) -> Result<()> {
        (**self).save_projection(projection).await
    }
}

/// In-memory read model store for testing and local runs.
///
/// Records are kept as serialized JSON, the same shape the PostgreSQL store
/// persists.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    documents: Arc<RwLock<HashMap<StreamId, serde_json::Value>>>,
}

impl InMemoryReadModelStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored projections.
    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns the raw stored document for a stream.
    pub async fn document(&self, stream_id: &StreamId) -> Option<serde_json::Value> {
        self.documents.read().await.get(stream_id).cloned()
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    fn name(&self) -> &'static str {
        "InMemoryReadModelStore"
    }

    async fn get_projection(&self, stream_id: &StreamId) -> Result<Option<BasketProjection>> {
        let documents = self.documents.read().await;
        documents
            .get(stream_id)
            .map(|doc| serde_json::from_value(doc.clone()).map_err(Into::into))
            .transpose()
    }

    async fn save_projection(&self, projection: &BasketProjection) -> Result<()> {
        let document = serde_json::to_value(projection)?;
        self.documents
            .write()
            .await
            .insert(projection.id.clone(), document);
        Ok(())
    }
}
