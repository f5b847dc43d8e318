use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, RetrievalMatch, ReviewMetadata, ReviewRecord,
    Stars,
};

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::config(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::retrieval(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            tracing::info!(collection = %self.collection, dimension = self.dimension, "creating collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(
                            self.dimension as u64,
                            Distance::Cosine,
                        )),
                )
                .await
                .map_err(|e| DomainError::retrieval(e.to_string()))?;
        }

        Ok(())
    }

    /// Stable numeric id for a professor name, so re-indexing overwrites.
    fn point_id(professor: &str) -> u64 {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, professor.as_bytes());
        let bytes = id.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, DomainError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::retrieval(e.to_string()))?;

        results
            .result
            .into_iter()
            .enumerate()
            .map(|(i, point)| {
                let (id, metadata) = review_from_payload(&point.payload)?;
                Ok(RetrievalMatch {
                    id,
                    metadata,
                    rank: i + 1,
                    score: Some(point.score),
                })
            })
            .collect()
    }

    async fn upsert(&self, records: &[(ReviewRecord, Embedding)]) -> Result<usize, DomainError> {
        let points = records
            .iter()
            .map(|(record, embedding)| {
                let payload: Payload = serde_json::json!({
                    "professor": record.professor,
                    "review": record.review,
                    "subject": record.subject,
                    "stars": record.stars.value(),
                })
                .try_into()
                .map_err(|_| DomainError::internal("Failed to create payload"))?;

                Ok(PointStruct::new(
                    Self::point_id(&record.professor),
                    embedding.as_slice().to_vec(),
                    payload,
                ))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| DomainError::retrieval(e.to_string()))?;

        Ok(count)
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

fn review_from_payload(
    payload: &HashMap<String, QdrantValue>,
) -> Result<(String, ReviewMetadata), DomainError> {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| DomainError::retrieval(format!("point payload has no {}", key)))
    };

    let stars = payload
        .get("stars")
        .and_then(|v| v.as_double().or_else(|| v.as_integer().map(|i| i as f64)))
        .ok_or_else(|| DomainError::retrieval("point payload has no stars"))?;

    Ok((
        text("professor")?,
        ReviewMetadata {
            review: text("review")?,
            subject: text("subject")?,
            stars: Stars(stars as f32),
        },
    ))
}
