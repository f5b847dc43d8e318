use crate::domain::{errors::DomainError, Embedding, RetrievalMatch, ReviewRecord};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns at most `top_k` matches with metadata, most similar first.
    /// An empty result is not an error.
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, DomainError>;

    /// Stores reviews keyed by professor name, returning how many were written.
    async fn upsert(&self, records: &[(ReviewRecord, Embedding)]) -> Result<usize, DomainError>;

    /// Short backend name for logs and readiness reports.
    fn backend(&self) -> &'static str;
}
