use std::fmt;
use std::time::Instant;

use futures::StreamExt;
use uuid::Uuid;

use crate::domain::{DomainError, TextStream};

/// Lifecycle of a single chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ReceivingInput,
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Streaming,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::ReceivingInput => Some(Self::Embedding),
            Self::Embedding => Some(Self::Retrieving),
            Self::Retrieving => Some(Self::Assembling),
            Self::Assembling => Some(Self::Generating),
            Self::Generating => Some(Self::Streaming),
            Self::Streaming => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReceivingInput => "receiving_input",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Generating => "generating",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one request through the pipeline stages.
///
/// Stages only move forward one step at a time; `Failed` can be entered from
/// any non-terminal stage.
pub struct PipelineRun {
    id: Uuid,
    stage: PipelineStage,
    trail: Vec<PipelineStage>,
    started: Instant,
}

impl PipelineRun {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: PipelineStage::ReceivingInput,
            trail: vec![PipelineStage::ReceivingInput],
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn trail(&self) -> &[PipelineStage] {
        &self.trail
    }

    pub fn advance(&mut self) -> PipelineStage {
        if let Some(next) = self.stage.successor() {
            self.enter(next);
        }
        self.stage
    }

    /// Moves to `Failed` and hands the error back for propagation.
    pub fn fail(&mut self, err: DomainError) -> DomainError {
        if !self.stage.is_terminal() {
            tracing::warn!(
                run_id = %self.id,
                stage = %self.stage,
                kind = err.kind(),
                error = %err,
                "pipeline failed"
            );
            self.enter(PipelineStage::Failed);
        }
        err
    }

    fn enter(&mut self, next: PipelineStage) {
        tracing::debug!(run_id = %self.id, from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
        self.trail.push(next);

        if next == PipelineStage::Done {
            tracing::info!(
                run_id = %self.id,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "answer delivered"
            );
        }
    }

    /// Forwards fragments unchanged, moving to `Done` when the stream ends
    /// and to `Failed` on the first error. Nothing is yielded after an error.
    /// A stream that ends without any text yields a generation error instead.
    pub fn track(self, fragments: TextStream) -> TextStream {
        futures::stream::unfold(
            (fragments, self, false),
            |(mut fragments, mut run, emitted)| async move {
                if run.stage.is_terminal() {
                    return None;
                }
                match fragments.next().await {
                    Some(Ok(text)) => {
                        let emitted = emitted || !text.is_empty();
                        Some((Ok(text), (fragments, run, emitted)))
                    }
                    Some(Err(err)) => {
                        let err = run.fail(err);
                        Some((Err(err), (fragments, run, emitted)))
                    }
                    None if !emitted => {
                        let err = run.fail(DomainError::generation("empty answer"));
                        Some((Err(err), (fragments, run, emitted)))
                    }
                    None => {
                        run.advance();
                        None
                    }
                }
            },
        )
        .boxed()
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::start()
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        if !self.stage.is_terminal() {
            tracing::debug!(
                run_id = %self.id,
                stage = %self.stage,
                "pipeline abandoned before completion"
            );
        }
    }
}
