use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::http::describe_failure;

/// Gemini `embedContent` client.
pub struct GeminiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl GeminiEmbedding {
    pub fn new(client: Client, api_key: impl Into<String>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(&self, method: &str, body: &impl Serialize) -> Result<Value, DomainError> {
        let resp = self
            .client
            .post(self.endpoint(method))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::embedding(format!(
                "provider returned {}",
                describe_failure(resp).await
            )));
        }

        resp.json()
            .await
            .map_err(|e| DomainError::embedding(format!("response is not JSON: {}", e)))
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> EmbedContentRequest<'a> {
    fn new(model: &'a str, text: &'a str) -> Self {
        Self {
            model,
            content: Content {
                parts: [Part { text }],
            },
        }
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedding {
    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let model = self.model_path();
        let body = self.post("embedContent", &EmbedContentRequest::new(&model, text)).await?;
        parse_embed_response(&body, self.dimension)
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model_path();
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest::new(&model, text))
                .collect(),
        };
        let body = self.post("batchEmbedContents", &request).await?;
        parse_batch_response(&body, texts.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Validates `{"embedding": {"values": [...]}}`.
pub fn parse_embed_response(body: &Value, dimension: usize) -> Result<Embedding, DomainError> {
    let values = body
        .get("embedding")
        .ok_or_else(|| DomainError::embedding("response has no embedding"))?
        .get("values")
        .ok_or_else(|| DomainError::embedding("response has no embedding values"))?;

    Embedding::validated(numbers(values)?, dimension)
}

/// Reads `{"embeddings": [{"values": [...]}, ...]}` without checking
/// dimensions; callers decide whether a bad vector is fatal.
pub fn parse_batch_response(body: &Value, expected: usize) -> Result<Vec<Embedding>, DomainError> {
    let items = body
        .get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::embedding("response has no embeddings array"))?;

    if items.len() != expected {
        return Err(DomainError::embedding(format!(
            "requested {} embeddings but received {}",
            expected,
            items.len()
        )));
    }

    items
        .iter()
        .map(|item| {
            let values = item
                .get("values")
                .ok_or_else(|| DomainError::embedding("embedding has no values"))?;
            numbers(values).map(Embedding::new)
        })
        .collect()
}

fn numbers(values: &Value) -> Result<Vec<f32>, DomainError> {
    let array = values
        .as_array()
        .ok_or_else(|| DomainError::embedding("embedding values is not an array"))?;

    array
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| DomainError::embedding(format!("component {} is not a number", i)))
        })
        .collect()
}
