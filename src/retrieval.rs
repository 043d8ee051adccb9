//! Context retrieval
//!
//! Embeds a query, searches a vector index for its nearest neighbours, and
//! folds the hits into one text blob for prompt augmentation.

mod gemini;
mod qdrant;

#[cfg(test)]
pub mod testing;

pub use gemini::GeminiEmbedder;
pub use qdrant::QdrantIndex;

use crate::error::{PipelineError, ServiceError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Separator placed between retrieved snippets
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Payload keys tried, in order, when pulling text out of a point
const TEXT_KEYS: [&str; 3] = ["text", "content", "page_content"];

/// Embedding model interface
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each input, returning one vector per input in order
    async fn embed(&self, model_id: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;
}

/// One hit from a similarity search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredPoint {
    pub score: Option<f32>,
    pub payload: Map<String, Value>,
}

impl ScoredPoint {
    /// Text carried by this point, or a JSON rendering of the whole payload
    pub fn text(&self) -> String {
        TEXT_KEYS
            .iter()
            .find_map(|key| self.payload.get(*key).and_then(Value::as_str))
            .map_or_else(
                || Value::Object(self.payload.clone()).to_string(),
                str::to_string,
            )
    }
}

#[cfg(test)]
impl ScoredPoint {
    pub fn with_payload(payload: Map<String, Value>) -> Self {
        Self {
            score: None,
            payload,
        }
    }
}

/// Similarity search interface
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` nearest points to `vector`, most relevant first
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ServiceError>;
}

/// Logging wrapper for embedders
pub struct LoggingEmbedder {
    inner: Arc<dyn Embedder>,
}

impl LoggingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Embedder for LoggingEmbedder {
    async fn embed(&self, model_id: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let start = Instant::now();
        let result = self.inner.embed(model_id, inputs).await;
        let duration = start.elapsed();

        match &result {
            Ok(vectors) => {
                tracing::info!(
                    model = %model_id,
                    duration_ms = %duration.as_millis(),
                    inputs = inputs.len(),
                    vectors = vectors.len(),
                    dimensions = vectors.first().map_or(0, Vec::len),
                    "Embedding request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Embedding request failed"
                );
            }
        }

        result
    }
}

/// Fetches context for a query from the embedder and vector index
pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    embedding_model: String,
    collection: String,
    timeout: Duration,
}

impl ContextRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        embedding_model: impl Into<String>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            embedding_model: embedding_model.into(),
            collection: collection.into(),
            timeout,
        }
    }

    /// Retrieve up to `limit` snippets relevant to `query`, joined by
    /// [`CONTEXT_SEPARATOR`]. No matches yields an empty string.
    pub async fn retrieve(&self, query: &str, limit: NonZeroUsize) -> Result<String, PipelineError> {
        let vectors = bounded(
            self.timeout,
            "embedding",
            self.embedder
                .embed(&self.embedding_model, &[query.to_string()]),
        )
        .await
        .map_err(PipelineError::Embedding)?;

        let vector = vectors.into_iter().next().ok_or_else(|| {
            PipelineError::Embedding(ServiceError::unknown("embedding service returned no vectors"))
        })?;

        let start = Instant::now();
        let points = bounded(
            self.timeout,
            "vector index query",
            self.index.query(&self.collection, &vector, limit.get()),
        )
        .await
        .map_err(PipelineError::Retrieval)?;

        tracing::info!(
            collection = %self.collection,
            limit = limit.get(),
            hits = points.len(),
            top_score = ?points.first().and_then(|p| p.score),
            duration_ms = %start.elapsed().as_millis(),
            "Context retrieved"
        );

        Ok(join_points(&points))
    }
}

/// Join point texts with the context separator, preserving order
pub fn join_points(points: &[ScoredPoint]) -> String {
    points
        .iter()
        .map(ScoredPoint::text)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

async fn bounded<T>(
    timeout: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
        Err(ServiceError::timeout(format!(
            "{what} exceeded {}s",
            timeout.as_secs()
        )))
    })
}
