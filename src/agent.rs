//! Agent runtime abstraction
//!
//! The generative agent is a black box that turns one user content unit into
//! a stream of [`AgentEvent`]s. Each chat call gets its own ephemeral session,
//! registered with a [`SessionStore`] before the run is submitted.

mod gemini;
mod session;
mod types;

#[cfg(test)]
pub mod testing;

pub use gemini::{GeminiAgent, GeminiAgentConfig, DEFAULT_GEMINI_BASE_URL};
pub use session::InMemorySessionStore;
pub use types::*;

use crate::error::{PipelineError, ServiceError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;

/// Application namespace every session is registered under
pub const APP_NAME: &str = "chat_relay";

/// Caller identity used for all sessions (no authentication)
pub const USER_ID: &str = "user";

/// Live, single-pass sequence of events from one agent run
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent, ServiceError>>;

/// Store that owns conversation sessions and their lifecycle
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a new session. Fails if the id is already taken.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), ServiceError>;

    /// Whether a live session is registered under this key
    async fn session_exists(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<bool, ServiceError>;
}

/// Agent runtime that executes one message against an existing session
pub trait AgentRuntime: Send + Sync {
    /// Submit `message` and return the run's event stream, unconsumed.
    ///
    /// The stream is lazy: no upstream work happens until it is first polled,
    /// and dropping it abandons the run.
    fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        mode: StreamingMode,
    ) -> AgentEventStream;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), ServiceError> {
        (**self).create_session(app_name, user_id, session_id).await
    }

    async fn session_exists(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<bool, ServiceError> {
        (**self).session_exists(app_name, user_id, session_id).await
    }
}

impl<T: AgentRuntime + ?Sized> AgentRuntime for Arc<T> {
    fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        mode: StreamingMode,
    ) -> AgentEventStream {
        (**self).run(user_id, session_id, message, mode)
    }
}

/// A started agent run bound to its session
pub struct AgentRun {
    pub session_id: String,
    pub events: AgentEventStream,
}

impl std::fmt::Debug for AgentRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRun")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Opens a fresh session per chat call and submits the message for streaming
pub struct AgentSessionBridge {
    runtime: Arc<dyn AgentRuntime>,
    sessions: Arc<dyn SessionStore>,
    session_timeout: Duration,
}

impl AgentSessionBridge {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        sessions: Arc<dyn SessionStore>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            sessions,
            session_timeout,
        }
    }

    /// Create the session, then submit `message` in token-level streaming mode
    pub async fn begin(&self, message: String) -> Result<AgentRun, PipelineError> {
        let session_id = uuid::Uuid::new_v4().to_string();

        tokio::time::timeout(
            self.session_timeout,
            self.sessions.create_session(APP_NAME, USER_ID, &session_id),
        )
        .await
        .map_err(|_| {
            ServiceError::timeout(format!(
                "session creation exceeded {}s",
                self.session_timeout.as_secs()
            ))
        })
        .and_then(|result| result)
        .map_err(PipelineError::Session)?;

        tracing::debug!(session_id = %session_id, "Session created");

        let events = self.runtime.run(
            USER_ID,
            &session_id,
            Content::user_text(message),
            StreamingMode::Sse,
        );

        Ok(AgentRun { session_id, events })
    }
}
