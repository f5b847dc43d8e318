mod conversation;
mod embedding;
mod generation;
mod review;

pub use conversation::{latest_user_query, ConversationTurn, Role};
pub use embedding::Embedding;
pub use generation::{ChatRole, ChatTurn, GenerationSession, GroundedContext, TextStream};
pub use review::{ReviewMetadata, ReviewRecord, RetrievalMatch, Stars, StaticCorpus};
