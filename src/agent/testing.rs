//! Mock implementations for testing
//!
//! These mocks let the pipeline and HTTP surface run without a real agent.

use super::{AgentEvent, AgentEventStream, AgentRuntime, Content, SessionStore, StreamingMode};
use crate::error::ServiceError;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// Mock Session Store
// ============================================================================

/// Session store that records every creation
pub struct MockSessionStore {
    created: Mutex<Vec<(String, String, String)>>,
    failure: Option<ServiceError>,
    delay: Option<Duration>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            failure: None,
            delay: None,
        }
    }

    /// Store whose every creation fails with `error`
    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// (app_name, user_id, session_id) for each created session
    pub fn created(&self) -> Vec<(String, String, String)> {
        self.created.lock().unwrap().clone()
    }
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), ServiceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.created.lock().unwrap().push((
            app_name.to_string(),
            user_id.to_string(),
            session_id.to_string(),
        ));
        Ok(())
    }

    async fn session_exists(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .created
            .lock()
            .unwrap()
            .iter()
            .any(|(a, u, s)| a == app_name && u == user_id && s == session_id))
    }
}

// ============================================================================
// Mock Agent Runtime
// ============================================================================

/// Arguments of one recorded `run` call
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub user_id: String,
    pub session_id: String,
    pub message: Content,
    pub mode: StreamingMode,
}

/// Agent runtime that replays a scripted event sequence on every run
pub struct MockAgentRuntime {
    script: Vec<Result<AgentEvent, ServiceError>>,
    runs: Mutex<Vec<RecordedRun>>,
}

impl MockAgentRuntime {
    pub fn new(script: Vec<Result<AgentEvent, ServiceError>>) -> Self {
        Self {
            script,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    fn record(&self, user_id: &str, session_id: &str, message: Content, mode: StreamingMode) {
        self.runs.lock().unwrap().push(RecordedRun {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            message,
            mode,
        });
    }
}

impl AgentRuntime for MockAgentRuntime {
    fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        mode: StreamingMode,
    ) -> AgentEventStream {
        self.record(user_id, session_id, message, mode);
        futures::stream::iter(self.script.clone()).boxed()
    }
}

// ============================================================================
// Channel-driven Agent Runtime (for cancellation and pacing tests)
// ============================================================================

/// Agent runtime whose single run is fed by the test through a channel
pub struct ChannelAgentRuntime {
    receiver: Mutex<Option<mpsc::Receiver<Result<AgentEvent, ServiceError>>>>,
}

impl ChannelAgentRuntime {
    /// Returns the runtime and the sender that drives its event stream
    pub fn new() -> (Self, mpsc::Sender<Result<AgentEvent, ServiceError>>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl AgentRuntime for ChannelAgentRuntime {
    fn run(
        &self,
        _user_id: &str,
        _session_id: &str,
        _message: Content,
        _mode: StreamingMode,
    ) -> AgentEventStream {
        match self.receiver.lock().unwrap().take() {
            Some(rx) => ReceiverStream::new(rx).boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}
