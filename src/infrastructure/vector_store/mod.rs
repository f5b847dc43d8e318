mod in_memory;
mod pinecone;
mod qdrant;

pub use in_memory::InMemoryVectorStore;
pub use pinecone::{parse_query_response, PineconeVectorStore};
pub use qdrant::QdrantVectorStore;
