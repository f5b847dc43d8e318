use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds one text. Implementations must return exactly `dimension()` values.
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    /// Embeds several texts, one result per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;
    fn dimension(&self) -> usize;
}
