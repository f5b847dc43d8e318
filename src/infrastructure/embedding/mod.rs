mod gemini;

pub use gemini::{parse_batch_response, parse_embed_response, GeminiEmbedding};
