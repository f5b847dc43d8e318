use std::time::Duration;

use reqwest::{Client, Response};

use crate::domain::DomainError;

const MAX_ERROR_BODY: usize = 512;

/// Builds the client shared by every provider adapter. No overall request
/// timeout is set here since generation responses are streamed; adapters set
/// per-request timeouts where the response is read whole.
pub fn build_client() -> Result<Client, DomainError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| DomainError::config(format!("failed to build HTTP client: {}", e)))
}

/// Describes a non-success response as `"<status>: <body>"` with the body
/// truncated for logging.
pub async fn describe_failure(resp: Response) -> String {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    format!("{}: {}", status, truncate(&body, MAX_ERROR_BODY))
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
