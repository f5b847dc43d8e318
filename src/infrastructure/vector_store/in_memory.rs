use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{ports::VectorStore, DomainError, Embedding, RetrievalMatch, ReviewRecord};

/// Cosine-similarity index held in process memory. Upserting a professor
/// that already exists replaces the stored review, like the hosted indexes.
pub struct InMemoryVectorStore {
    reviews: RwLock<Vec<(ReviewRecord, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            reviews: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.reviews.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, DomainError> {
        let store = self
            .reviews
            .read()
            .map_err(|e| DomainError::retrieval(e.to_string()))?;

        let mut scored: Vec<(&ReviewRecord, f32)> = store
            .iter()
            .map(|(record, embedding)| (record, vector.cosine_similarity(embedding)))
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(i, (record, score))| RetrievalMatch {
                id: record.professor.clone(),
                metadata: record.metadata(),
                rank: i + 1,
                score: Some(score),
            })
            .collect())
    }

    async fn upsert(&self, records: &[(ReviewRecord, Embedding)]) -> Result<usize, DomainError> {
        let mut store = self
            .reviews
            .write()
            .map_err(|e| DomainError::retrieval(e.to_string()))?;

        for (record, embedding) in records {
            store.retain(|(r, _)| r.professor != record.professor);
            store.push((record.clone(), embedding.clone()));
        }
        Ok(records.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
