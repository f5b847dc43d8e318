pub mod config;
pub mod embedding;
pub mod http;
pub mod llm;
pub mod logging;
pub mod providers;
pub mod vector_store;

pub use config::{AppConfig, Config, RetrievalBackend, Secrets};
pub use embedding::GeminiEmbedding;
pub use llm::GeminiChat;
pub use providers::{build_providers, Providers};
pub use vector_store::{InMemoryVectorStore, PineconeVectorStore, QdrantVectorStore};
