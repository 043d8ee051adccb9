//! Chat pipeline: retrieval, augmentation, session bridge, translation

use crate::agent::AgentSessionBridge;
use crate::error::PipelineError;
use crate::prompt::augment;
use crate::retrieval::ContextRetriever;
use crate::stream::{translate, WireStream};
use futures::StreamExt;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Retrieval settings for the augmented variant
pub struct RetrievalStage {
    pub retriever: ContextRetriever,
    pub limit: NonZeroUsize,
}

/// Runs one chat call from question to wire event stream
pub struct ChatPipeline {
    retrieval: Option<RetrievalStage>,
    bridge: AgentSessionBridge,
    idle_timeout: Duration,
}

impl ChatPipeline {
    pub fn new(
        retrieval: Option<RetrievalStage>,
        bridge: AgentSessionBridge,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            retrieval,
            bridge,
            idle_timeout,
        }
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.retrieval.is_some()
    }

    /// Build the outgoing message: augmented when retrieval is configured,
    /// the raw question otherwise
    pub async fn prepare(&self, question: &str) -> Result<String, PipelineError> {
        match &self.retrieval {
            Some(stage) => {
                let context = stage.retriever.retrieve(question, stage.limit).await?;
                Ok(augment(question, &context))
            }
            None => Ok(question.to_string()),
        }
    }

    /// Run every pre-stream step and return the live wire event stream.
    ///
    /// Errors here happen before any frame is produced.
    pub async fn start(&self, question: &str) -> Result<WireStream, PipelineError> {
        let message = self.prepare(question).await?;
        let run = self.bridge.begin(message).await?;
        tracing::info!(
            session_id = %run.session_id,
            augmented = self.retrieval_enabled(),
            "Streaming agent response"
        );
        Ok(translate(run, self.idle_timeout).boxed())
    }
}

#[cfg(test)]
pub mod testing {
    //! Pipeline assembly from mocks

    use super::*;
    use crate::agent::testing::{MockAgentRuntime, MockSessionStore};
    use crate::agent::{AgentRuntime, SessionStore};
    use crate::retrieval::testing::{MockEmbedder, MockVectorIndex};
    use std::sync::Arc;

    pub fn bridge(
        runtime: Arc<dyn AgentRuntime>,
        sessions: Arc<dyn SessionStore>,
    ) -> AgentSessionBridge {
        AgentSessionBridge::new(runtime, sessions, Duration::from_secs(5))
    }

    pub fn retrieval(index: Arc<MockVectorIndex>) -> RetrievalStage {
        RetrievalStage {
            retriever: ContextRetriever::new(
                Arc::new(MockEmbedder::new(vec![0.1, 0.2, 0.3])),
                index,
                "text-embedding-004",
                "docs",
                Duration::from_secs(5),
            ),
            limit: NonZeroUsize::new(3).unwrap(),
        }
    }

    /// Pipeline over the given mocks
    pub fn pipeline(
        retrieval: Option<RetrievalStage>,
        runtime: Arc<MockAgentRuntime>,
        sessions: Arc<MockSessionStore>,
    ) -> ChatPipeline {
        ChatPipeline::new(retrieval, bridge(runtime, sessions), Duration::from_secs(5))
    }
}
