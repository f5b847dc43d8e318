mod context;
mod indexing;
mod rag;
mod stage;

pub use context::{ContextAssembler, PromptTemplates};
pub use indexing::{IndexReport, IndexService};
pub use rag::{RagPipeline, MAX_TOP_K};
pub use stage::{PipelineRun, PipelineStage};
