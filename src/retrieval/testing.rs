//! Mock embedder and vector index for testing

use super::{Embedder, ScoredPoint, VectorIndex};
use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded (model_id, inputs) pairs
pub type EmbedCalls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

/// Embedder returning the same fixed vector for every input
pub struct MockEmbedder {
    vector: Option<Vec<f32>>,
    failure: Option<ServiceError>,
    calls: EmbedCalls,
}

impl MockEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            failure: None,
            calls: Arc::default(),
        }
    }

    /// Embedder that answers with zero vectors
    pub fn empty() -> Self {
        Self {
            vector: None,
            failure: None,
            calls: Arc::default(),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::empty()
        }
    }

    /// Shared handle to the call log, usable after the mock is moved
    pub fn calls_handle(&self) -> EmbedCalls {
        self.calls.clone()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, model_id: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((model_id.to_string(), inputs.to_vec()));
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(match &self.vector {
            Some(vector) => inputs.iter().map(|_| vector.clone()).collect(),
            None => Vec::new(),
        })
    }
}

/// Vector index returning a fixed list of points
pub struct MockVectorIndex {
    points: Vec<ScoredPoint>,
    failure: Option<ServiceError>,
    delay: Option<Duration>,
    queries: Mutex<Vec<(String, Vec<f32>, usize)>>,
}

impl MockVectorIndex {
    pub fn new(points: Vec<ScoredPoint>) -> Self {
        Self {
            points,
            failure: None,
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// (collection, vector, limit) for each query made
    pub fn queries(&self) -> Vec<(String, Vec<f32>, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ServiceError> {
        self.queries
            .lock()
            .unwrap()
            .push((collection.to_string(), vector.to_vec(), limit));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.points.iter().take(limit).cloned().collect())
    }
}
