use std::time::Duration;

use async_trait::async_trait;
use futures::{future, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{ports::LlmService, ChatRole, DomainError, GenerationSession, TextStream};
use crate::infrastructure::config::LlmConfig;
use crate::infrastructure::http::describe_failure;
use crate::infrastructure::llm::sse;

/// Gemini chat client. The seeded session is sent as `contents`, so no
/// provider-side system role is needed.
pub struct GeminiChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl GeminiChat {
    pub fn new(client: Client, api_key: impl Into<String>, config: &LlmConfig) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn send(&self, url: String, session: &GenerationSession) -> Result<Response, DomainError> {
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::from_session(session, self.temperature))
            .send()
            .await
            .map_err(|e| DomainError::generation(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::generation(format!(
                "provider returned {}",
                describe_failure(resp).await
            )));
        }

        Ok(resp)
    }
}

#[async_trait]
impl LlmService for GeminiChat {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_stream(
        &self,
        session: &GenerationSession,
    ) -> Result<TextStream, DomainError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let resp = tokio::time::timeout(self.timeout, self.send(url, session))
            .await
            .map_err(|_| DomainError::generation("generation timed out"))??;

        Ok(sse::events(resp.bytes_stream())
            .try_filter_map(|payload| future::ready(chunk_text(&payload)))
            .boxed())
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, session: &GenerationSession) -> Result<String, DomainError> {
        let request = async {
            let resp = self.send(self.endpoint("generateContent"), session).await?;
            resp.json::<GenerateResponse>()
                .await
                .map_err(|e| DomainError::generation(format!("malformed response: {}", e)))
        };
        let body = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| DomainError::generation("generation timed out"))??;

        if body.candidates.is_empty() && body.block_reason().is_none() {
            return Err(DomainError::generation("response has no candidates"));
        }

        let text = body.text()?;
        if text.trim().is_empty() {
            return Err(DomainError::generation("empty answer"));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateRequest<'a> {
    fn from_session(session: &'a GenerationSession, temperature: Option<f32>) -> Self {
        Self {
            contents: session
                .turns()
                .map(|(role, text)| Content {
                    role,
                    parts: [Part { text }],
                })
                .collect(),
            generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: ChatRole,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    /// Text of the first candidate; empty when it carries no text parts.
    /// A candidate that stopped for any reason other than a normal finish or
    /// the token limit is an error, even if it carried text.
    fn text(&self) -> Result<String, DomainError> {
        if let Some(reason) = self.block_reason() {
            return Err(DomainError::generation(format!("prompt blocked: {}", reason)));
        }

        let candidate = self.candidates.first();
        if let Some(reason) = candidate.and_then(|c| c.finish_reason.as_deref()) {
            if !matches!(reason, "STOP" | "MAX_TOKENS") {
                return Err(DomainError::generation(format!(
                    "generation stopped: {}",
                    reason
                )));
            }
        }

        Ok(candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

/// Parses one streamed event into its text fragment, if any.
fn chunk_text(payload: &str) -> Result<Option<String>, DomainError> {
    let chunk: GenerateResponse = serde_json::from_str(payload)
        .map_err(|e| DomainError::generation(format!("malformed stream event: {}", e)))?;
    let text = chunk.text()?;
    Ok((!text.is_empty()).then_some(text))
}
