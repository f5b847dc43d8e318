use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::{stream, StreamExt};
use tower::ServiceExt;

use prof_rag::api::{create_router, AppState};
use prof_rag::application::{ContextAssembler, IndexService, RagPipeline};
use prof_rag::domain::ports::{EmbeddingService, LlmService, VectorStore};
use prof_rag::domain::{
    DomainError, Embedding, GenerationSession, ReviewRecord, StaticCorpus, TextStream,
};
use prof_rag::infrastructure::{AppConfig, InMemoryVectorStore};

const DIM: usize = 4;

/// Maps a few keywords onto axes so similarity is predictable.
struct KeywordEmbedder {
    fail: bool,
}

impl KeywordEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let axis = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
        vec![
            axis("calculus") + axis("limits"),
            axis("physics"),
            axis("chemistry"),
            0.1,
        ]
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        if self.fail {
            return Err(DomainError::embedding("response has no embedding values"));
        }
        Ok(Embedding::new(Self::vector(text)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts
            .iter()
            .map(|t| Embedding::new(Self::vector(t)))
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Echoes whether the grounded message mentioned each professor, then
/// optionally fails mid-stream.
struct EchoLlm {
    fail_after_first: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmService for EchoLlm {
    async fn generate_stream(
        &self,
        session: &GenerationSession,
    ) -> Result<TextStream, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let message = session.message().as_str();

        let mut items: Vec<Result<String, DomainError>> = vec![Ok("Based on reviews, ".to_string())];
        if self.fail_after_first {
            items.push(Err(DomainError::generation("stream reset")));
        } else if message.contains("Professor: Dr. A") {
            items.push(Ok("Dr. A teaches Calculus well.".to_string()));
        } else {
            items.push(Ok("I could not find a match.".to_string()));
        }

        Ok(stream::iter(items).boxed())
    }
}

struct Harness {
    router: Router,
    llm: Arc<EchoLlm>,
}

async fn harness(embed_fails: bool, llm_fails: bool) -> Harness {
    let corpus = Arc::new(StaticCorpus::new(
        "reviews.json",
        vec![
            ReviewRecord::new("Dr. A", "Explains limits in calculus well.", "Calculus", 5.0),
            ReviewRecord::new("Dr. B", "Physics labs are chaotic.", "Physics", 2.0),
            ReviewRecord::new("Dr. C", "Great chemistry demos.", "Chemistry", 4.0),
        ],
    ));

    let store = Arc::new(InMemoryVectorStore::new());
    let indexer_embedder = Arc::new(KeywordEmbedder { fail: false });
    IndexService::new(indexer_embedder, store.clone())
        .index(corpus.reviews())
        .await
        .unwrap();

    let llm = Arc::new(EchoLlm {
        fail_after_first: llm_fails,
        calls: AtomicUsize::new(0),
    });
    let embedder: Arc<dyn EmbeddingService> = Arc::new(KeywordEmbedder { fail: embed_fails });
    let vector_store: Arc<dyn VectorStore> = store;

    let pipeline = RagPipeline::new(
        embedder,
        vector_store,
        llm.clone(),
        corpus,
        ContextAssembler::default(),
        2,
    )
    .unwrap();

    let state = AppState::new(Arc::new(pipeline), AppConfig::default());
    Harness {
        router: create_router(state),
        llm,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(body: Body) -> String {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn chat_streams_plain_text_answer() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/chat",
            r#"[{"role":"user","content":"Who teaches good Calculus classes?"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let text = body_text(response.into_body()).await;
    assert_eq!(text, "Based on reviews, Dr. A teaches Calculus well.");
}

#[tokio::test]
async fn chat_buffered_answer() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/chat?stream=false",
            r#"[{"role":"user","content":"Any calculus tips?"},{"role":"assistant","content":"Sure."},{"role":"user","content":"Who explains limits?"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response.into_body()).await;
    assert!(text.contains("Dr. A"));
}

#[tokio::test]
async fn chat_rejects_empty_conversation() {
    let h = harness(false, false).await;

    let response = h.router.oneshot(post_json("/api/chat", "[]")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_rejects_trailing_assistant_turn() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/chat",
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_rejects_malformed_body() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json("/api/chat", r#"{"message":"hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn embedding_failure_is_bad_gateway() {
    let h = harness(true, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/chat",
            r#"[{"role":"user","content":"Who teaches Calculus?"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let text = body_text(response.into_body()).await;
    assert!(!text.contains("embedding values"));
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mid_stream_failure_truncates_body() {
    let h = harness(false, true).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/chat",
            r#"[{"role":"user","content":"Who teaches Calculus?"}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn search_returns_ranked_matches() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/search",
            r#"{"query":"physics professor","top_k":1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let matches: serde_json::Value =
        serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(matches.as_array().unwrap().len(), 1);
    assert_eq!(matches[0]["id"], "Dr. B");
    assert_eq!(matches[0]["rank"], 1);
    assert_eq!(matches[0]["metadata"]["subject"], "Physics");
}

#[tokio::test]
async fn search_rejects_oversized_top_k() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json(
            "/api/search",
            r#"{"query":"physics professor","top_k":20000}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let text = body_text(response.into_body()).await;
    assert!(text.contains("top_k"));
}

#[tokio::test]
async fn search_rejects_blank_query() {
    let h = harness(false, false).await;

    let response = h
        .router
        .oneshot(post_json("/api/search", r#"{"query":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_readiness() {
    let h = harness(false, false).await;

    let response = h
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .router
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ready: serde_json::Value =
        serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(ready["backend"], "memory");
    assert_eq!(ready["reviews"], 3);
    assert_eq!(ready["top_k"], 2);
    assert_eq!(ready["dimension"], 4);
}
