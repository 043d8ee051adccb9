//! Qdrant vector index over its REST API

use super::{ScoredPoint, VectorIndex};
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vector index backed by a Qdrant server
pub struct QdrantIndex {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    pub fn new(client: Client, url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn search_endpoint(&self, collection: &str) -> String {
        format!("{}/collections/{collection}/points/search", self.url)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ServiceError> {
        let mut request = self
            .client
            .post(self.search_endpoint(collection))
            .json(&SearchRequest {
                vector,
                limit,
                with_payload: true,
            });
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ServiceError::from_status(status.as_u16(), error_message(&body)));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Vec<ScoredPoint>, ServiceError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::unknown(format!("Failed to parse search response: {e}")))?;

    Ok(parsed
        .result
        .into_iter()
        .map(|hit| ScoredPoint {
            score: hit.score,
            payload: hit.payload.unwrap_or_default(),
        })
        .collect())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|resp| resp.status.error)
        .unwrap_or_else(|| body.to_string())
}

// Qdrant REST types

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: Option<f32>,
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    status: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    error: Option<String>,
}
