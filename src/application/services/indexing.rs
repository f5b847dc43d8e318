use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DomainError, Embedding, ReviewRecord,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub upserted: usize,
    pub skipped: usize,
}

/// Embeds corpus reviews and writes them to the vector index.
pub struct IndexService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl IndexService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            vector_store,
            batch_size: 50,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Reviews whose embedding has the wrong dimension are skipped with a
    /// warning rather than failing the whole run.
    #[instrument(skip(self, reviews), fields(count = reviews.len()))]
    pub async fn index(&self, reviews: &[ReviewRecord]) -> Result<IndexReport, DomainError> {
        let dimension = self.embedding.dimension();
        let mut report = IndexReport::default();

        for batch in reviews.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|r| r.review.as_str()).collect();
            let embeddings = self.embedding.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(DomainError::embedding(format!(
                    "requested {} embeddings but received {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let mut valid: Vec<(ReviewRecord, Embedding)> = Vec::with_capacity(batch.len());
            for (record, embedding) in batch.iter().zip(embeddings) {
                match embedding.ensure_dimension(dimension) {
                    Ok(()) => valid.push((record.clone(), embedding)),
                    Err(e) => {
                        tracing::warn!(professor = %record.professor, error = %e, "skipping review");
                        report.skipped += 1;
                    }
                }
            }

            if !valid.is_empty() {
                report.upserted += self.vector_store.upsert(&valid).await?;
            }
        }

        tracing::info!(
            upserted = report.upserted,
            skipped = report.skipped,
            backend = self.vector_store.backend(),
            "corpus indexed"
        );

        Ok(report)
    }
}
