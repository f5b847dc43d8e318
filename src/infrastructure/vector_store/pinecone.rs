use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, RetrievalMatch, ReviewMetadata, ReviewRecord,
};
use crate::infrastructure::config::PineconeConfig;
use crate::infrastructure::http::describe_failure;

const UPSERT_BATCH: usize = 100;

/// Pinecone data-plane client for one index.
pub struct PineconeVectorStore {
    client: Client,
    api_key: String,
    base_url: String,
    namespace: Option<String>,
    api_version: String,
    timeout: Duration,
}

impl PineconeVectorStore {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        config: &PineconeConfig,
    ) -> Result<Self, DomainError> {
        let host = config.index_host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(DomainError::config(
                "retrieval.pinecone.index_host (or PINECONE_INDEX_HOST) is not set",
            ));
        }

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, DomainError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::retrieval(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::retrieval(format!(
                "index returned {}",
                describe_failure(resp).await
            )));
        }

        resp.json()
            .await
            .map_err(|e| DomainError::retrieval(format!("response is not JSON: {}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: ReviewMetadata,
}

#[derive(Deserialize)]
struct QueryResponse {
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: Option<f32>,
    metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, DomainError> {
        let request = QueryRequest {
            vector: vector.as_slice(),
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let body = self.post("/query", &request).await?;
        parse_query_response(body)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[(ReviewRecord, Embedding)]) -> Result<usize, DomainError> {
        let mut upserted = 0;

        for batch in records.chunks(UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|(record, embedding)| UpsertVector {
                        id: &record.professor,
                        values: embedding.as_slice(),
                        metadata: record.metadata(),
                    })
                    .collect(),
                namespace: self.namespace.as_deref(),
            };

            let body = self.post("/vectors/upsert", &request).await?;
            let resp: UpsertResponse = serde_json::from_value(body)
                .map_err(|e| DomainError::retrieval(format!("malformed upsert response: {}", e)))?;
            upserted += resp.upserted_count;
        }

        Ok(upserted)
    }

    fn backend(&self) -> &'static str {
        "pinecone"
    }
}

/// Converts `{"matches": [{"id", "score", "metadata": {review, subject, stars}}]}`
/// into ranked matches, keeping the index's order.
pub fn parse_query_response(body: Value) -> Result<Vec<RetrievalMatch>, DomainError> {
    let resp: QueryResponse = serde_json::from_value(body)
        .map_err(|e| DomainError::retrieval(format!("malformed query response: {}", e)))?;

    resp.matches
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let metadata = m
                .metadata
                .ok_or_else(|| DomainError::retrieval(format!("match {} has no metadata", m.id)))?;
            let metadata: ReviewMetadata = serde_json::from_value(metadata).map_err(|e| {
                DomainError::retrieval(format!("match {} has invalid metadata: {}", m.id, e))
            })?;

            Ok(RetrievalMatch {
                id: m.id,
                metadata,
                rank: i + 1,
                score: m.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_response_keeps_order() {
        let body = json!({
            "matches": [
                { "id": "Dr. B", "score": 0.91, "metadata": { "review": "Tough but fair.", "subject": "Physics", "stars": 4.0 } },
                { "id": "Dr. A", "score": 0.87, "metadata": { "review": "Great.", "subject": "Calculus", "stars": 5 } }
            ],
            "namespace": ""
        });

        let matches = parse_query_response(body).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "Dr. B");
        assert_eq!(matches[0].rank, 1);
        assert_eq!(matches[1].id, "Dr. A");
        assert_eq!(matches[1].rank, 2);
        assert_eq!(matches[1].metadata.stars.to_string(), "5");
    }

    #[test]
    fn test_parse_empty_matches() {
        let matches = parse_query_response(json!({ "matches": [] })).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_parse_missing_metadata_is_error() {
        let body = json!({ "matches": [ { "id": "Dr. A", "score": 0.5 } ] });
        let err = parse_query_response(body).unwrap_err();
        assert!(matches!(err, DomainError::Retrieval(_)));
    }

    #[test]
    fn test_parse_incomplete_metadata_is_error() {
        let body = json!({ "matches": [ { "id": "Dr. A", "metadata": { "review": "ok" } } ] });
        assert!(parse_query_response(body).is_err());
    }

    #[test]
    fn test_parse_missing_matches_is_error() {
        assert!(parse_query_response(json!({ "error": "unauthorized" })).is_err());
    }

    #[test]
    fn test_query_request_shape() {
        let vector = [0.5f32, 0.25];
        let request = QueryRequest {
            vector: &vector,
            top_k: 5,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "vector": [0.5, 0.25], "topK": 5, "includeMetadata": true, "includeValues": false })
        );
    }

    #[test]
    fn test_host_is_required() {
        let client = Client::new();
        let result = PineconeVectorStore::new(client, "key", &PineconeConfig::default());
        assert!(matches!(result, Err(DomainError::Config(_))));
    }

    #[test]
    fn test_host_gets_https_scheme() {
        let config = PineconeConfig {
            index_host: "rag-abc.svc.pinecone.io/".to_string(),
            ..PineconeConfig::default()
        };
        let store = PineconeVectorStore::new(Client::new(), "key", &config).unwrap();
        assert_eq!(store.base_url, "https://rag-abc.svc.pinecone.io");
    }
}
