//! Application layer - Use cases and orchestration.
//!
//! This module contains the request pipeline, the prompt assembly it relies
//! on and the corpus indexing service. Services depend on domain ports
//! (traits) rather than concrete implementations.

pub mod services;

pub use services::{
    ContextAssembler, IndexReport, IndexService, PipelineRun, PipelineStage, PromptTemplates,
    RagPipeline, MAX_TOP_K,
};
