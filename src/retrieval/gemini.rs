//! Gemini embedding service

use super::Embedder;
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Embedder backed by the Gemini `batchEmbedContents` endpoint
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(client: Client, api_key: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{model_id}:batchEmbedContents", self.base_url)
    }
}

fn build_request(model_id: &str, inputs: &[String]) -> BatchEmbedRequest {
    BatchEmbedRequest {
        requests: inputs
            .iter()
            .map(|text| EmbedRequest {
                model: format!("models/{model_id}"),
                content: EmbedContent {
                    parts: vec![EmbedPart { text: text.clone() }],
                },
            })
            .collect(),
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, model_id: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(model_id))
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(model_id, inputs))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Vec<Vec<f32>>, ServiceError> {
    let parsed: BatchEmbedResponse = serde_json::from_str(body).map_err(|e| {
        ServiceError::unknown(format!("Failed to parse embedding response: {e}"))
    })?;
    Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
}

// Gemini embedding API types

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
