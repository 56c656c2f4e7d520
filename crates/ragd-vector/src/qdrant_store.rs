//! Qdrant implementation of the vector index
//!
//! Owns one named collection. Collection creation fixes the distance
//! metric to cosine, matching the embedding model's normalization
//! assumption.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, Condition, CountPointsBuilder, CreateCollectionBuilder, DeleteCollectionBuilder,
    Distance, Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

use ragd_core::config::QdrantConfig;
use ragd_core::{IndexPoint, RagdError, Result, SearchFilter, SearchHit, VectorIndex};

/// Qdrant vector store
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    /// One-shot recreate directive: consumed by the first
    /// `ensure_collection` call, idempotent afterwards.
    recreate: AtomicBool,
}

impl QdrantStore {
    /// Connect to Qdrant
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .build()
            .map_err(|e| RagdError::VectorBackend(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            recreate: AtomicBool::new(config.recreate_collection),
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Qdrant point ids must be integers or UUIDs. Chunk ids are
    /// strings, so each maps to a deterministic UUIDv5 of itself; the
    /// original id travels in the payload. Re-ingesting the same chunk
    /// id therefore overwrites the same point.
    fn point_uuid(id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())
    }

    /// Whether the collection exists. An error here means the backend
    /// is unreachable, which is distinct from "not found".
    async fn collection_exists(&self) -> Result<bool> {
        let collections = self.client.list_collections().await.map_err(|e| {
            RagdError::VectorBackend(format!("Failed to list collections: {e}"))
        })?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    async fn create_collection(&self, dimension: usize) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| RagdError::VectorBackend(format!("Failed to create collection: {e}")))?;

        tracing::info!(
            "created collection {} (dim={dimension}, cosine)",
            self.collection
        );
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut exists = self.collection_exists().await?;

        if exists && self.recreate.swap(false, Ordering::SeqCst) {
            tracing::warn!("recreate directive set, dropping collection {}", self.collection);
            self.client
                .delete_collection(DeleteCollectionBuilder::new(&self.collection))
                .await
                .map_err(|e| {
                    RagdError::VectorBackend(format!("Failed to delete collection: {e}"))
                })?;
            exists = false;
        }

        if !exists {
            self.create_collection(dimension).await?;
        }

        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let mut payload = point.payload;
                payload.insert("id".into(), point.id.clone().into());

                let payload_map: std::collections::HashMap<String, qdrant_client::qdrant::Value> =
                    payload.into_iter().map(|(k, v)| (k, v.into())).collect();

                PointStruct::new(
                    Self::point_uuid(&point.id).to_string(),
                    point.vector,
                    payload_map,
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| RagdError::VectorBackend(format!("Failed to upsert vectors: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<SearchHit>> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k as u64).with_payload(true);

        if let Some(f) = filter {
            builder = builder.filter(Filter::must([Condition::matches(f.field, f.value)]));
        }

        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagdError::SearchError(format!("Vector search failed: {e}")))?;

        let hits = results
            .result
            .into_iter()
            .map(|point| {
                let payload: serde_json::Map<String, serde_json::Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, qdrant_value_to_json(v)))
                    .collect();

                let id = payload
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                SearchHit {
                    id,
                    score: point.score,
                    payload,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self) -> Result<u64> {
        if !self.collection_exists().await? {
            return Err(RagdError::CollectionMissing(self.collection.clone()));
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| RagdError::VectorBackend(format!("Failed to count points: {e}")))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

/// Convert a stored payload value back to JSON for the search hit.
fn qdrant_value_to_json(value: Value) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => b.into(),
        Some(Kind::IntegerValue(i)) => i.into(),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => s.into(),
        Some(Kind::ListValue(list)) => serde_json::Value::Array(
            list.values.into_iter().map(qdrant_value_to_json).collect(),
        ),
        Some(Kind::StructValue(fields)) => serde_json::Value::Object(
            fields
                .fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
    }
}
