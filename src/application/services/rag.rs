use std::sync::Arc;
use tracing::instrument;

use crate::application::services::context::ContextAssembler;
use crate::application::services::stage::PipelineRun;
use crate::domain::{
    latest_user_query,
    ports::{EmbeddingService, LlmService, VectorStore},
    ConversationTurn, DomainError, Embedding, GenerationSession, RetrievalMatch, StaticCorpus,
    TextStream,
};

/// Largest `top_k` accepted from configuration or a search request.
pub const MAX_TOP_K: usize = 100;

/// Answers a conversation: embed the latest user turn, fetch similar reviews,
/// assemble the grounded prompt, then generate.
///
/// Holds only shared read-only state, so one instance serves every request.
pub struct RagPipeline {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmService>,
    assembler: ContextAssembler,
    corpus: Arc<StaticCorpus>,
    system_instruction: Arc<str>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmService>,
        corpus: Arc<StaticCorpus>,
        assembler: ContextAssembler,
        top_k: usize,
    ) -> Result<Self, DomainError> {
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(DomainError::config(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        let system_instruction: Arc<str> = assembler.system_instruction(&corpus)?.into();

        Ok(Self {
            embedding,
            vector_store,
            llm,
            assembler,
            corpus,
            system_instruction,
            top_k,
        })
    }

    pub fn corpus(&self) -> &StaticCorpus {
        &self.corpus
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn dimension(&self) -> usize {
        self.embedding.dimension()
    }

    pub fn backend(&self) -> &'static str {
        self.vector_store.backend()
    }

    /// Runs the pipeline and returns the answer as it is generated.
    ///
    /// Every step before generation completes before this returns, so any
    /// error up to and including the generation request is reported here.
    #[instrument(skip_all, fields(turns = conversation.len()))]
    pub async fn handle(&self, conversation: &[ConversationTurn]) -> Result<TextStream, DomainError> {
        let mut run = PipelineRun::start();
        let session = self.prepare(conversation, &mut run).await?;

        run.advance();
        let fragments = self
            .llm
            .generate_stream(&session)
            .await
            .map_err(|e| run.fail(e))?;

        run.advance();
        Ok(run.track(fragments))
    }

    /// Runs the pipeline and waits for the full answer.
    #[instrument(skip_all, fields(turns = conversation.len()))]
    pub async fn answer(&self, conversation: &[ConversationTurn]) -> Result<String, DomainError> {
        let mut run = PipelineRun::start();
        let session = self.prepare(conversation, &mut run).await?;

        run.advance();
        let text = self.llm.generate(&session).await.map_err(|e| run.fail(e))?;
        if text.trim().is_empty() {
            return Err(run.fail(DomainError::generation("empty answer")));
        }

        run.advance();
        run.advance();
        Ok(text)
    }

    /// Embeds `query` and returns the `top_k` closest reviews.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::input("query is empty"));
        }
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(DomainError::input(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        let embedding = self.embed_query(query).await?;
        self.vector_store.query(&embedding, top_k).await
    }

    async fn prepare(
        &self,
        conversation: &[ConversationTurn],
        run: &mut PipelineRun,
    ) -> Result<GenerationSession, DomainError> {
        let query = latest_user_query(conversation).map_err(|e| run.fail(e))?;

        run.advance();
        let embedding = self.embed_query(query).await.map_err(|e| run.fail(e))?;

        run.advance();
        let matches = self
            .vector_store
            .query(&embedding, self.top_k)
            .await
            .map_err(|e| run.fail(e))?;
        tracing::debug!(run_id = %run.id(), matches = matches.len(), "reviews retrieved");

        run.advance();
        let context = self.assembler.assemble(&self.corpus, &matches, query);
        Ok(self.assembler.session(&self.system_instruction, context))
    }

    async fn embed_query(&self, query: &str) -> Result<Embedding, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        embedding.ensure_dimension(self.embedding.dimension())?;
        Ok(embedding)
    }
}
