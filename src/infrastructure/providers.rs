use std::sync::Arc;

use crate::domain::ports::{EmbeddingService, LlmService, VectorStore};
use crate::domain::DomainError;
use crate::infrastructure::config::{AppConfig, RetrievalBackend, Secrets};
use crate::infrastructure::embedding::GeminiEmbedding;
use crate::infrastructure::http::build_client;
use crate::infrastructure::llm::GeminiChat;
use crate::infrastructure::vector_store::{
    InMemoryVectorStore, PineconeVectorStore, QdrantVectorStore,
};

/// The three external services a pipeline talks to.
#[derive(Clone)]
pub struct Providers {
    pub embedding: Arc<dyn EmbeddingService>,
    pub vector_store: Arc<dyn VectorStore>,
    pub llm: Arc<dyn LlmService>,
}

/// Builds provider adapters sharing one HTTP client. Fails fast when a
/// credential the selected backend needs is missing.
pub async fn build_providers(app: &AppConfig, secrets: &Secrets) -> Result<Providers, DomainError> {
    let config = &app.config;
    let client = build_client()?;
    let gemini_key = secrets.gemini()?;

    let embedding = Arc::new(GeminiEmbedding::new(
        client.clone(),
        gemini_key,
        &config.embedding,
    ));
    let llm = Arc::new(GeminiChat::new(client.clone(), gemini_key, &config.llm));

    let vector_store: Arc<dyn VectorStore> = match config.retrieval.backend {
        RetrievalBackend::Pinecone => Arc::new(PineconeVectorStore::new(
            client,
            secrets.pinecone()?,
            &config.retrieval.pinecone,
        )?),
        RetrievalBackend::Qdrant => Arc::new(
            QdrantVectorStore::new(
                &config.retrieval.qdrant.url,
                &config.retrieval.qdrant.collection,
                config.embedding.dimension,
            )
            .await?,
        ),
        RetrievalBackend::Memory => Arc::new(InMemoryVectorStore::new()),
    };

    tracing::info!(
        backend = vector_store.backend(),
        embedding_model = %config.embedding.model,
        llm_model = %config.llm.model,
        "providers ready"
    );

    Ok(Providers {
        embedding,
        vector_store,
        llm,
    })
}
