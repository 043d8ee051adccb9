//! Google Gemini agent runtime
//!
//! Streams `streamGenerateContent?alt=sse` chunks as [`AgentEvent`]s. A chunk
//! whose candidate carries a `finishReason` is the run's final response.

use super::types::{AgentEvent, Content, ContentRole, Part, StreamingMode};
use super::{AgentEventStream, AgentRuntime, SessionStore, APP_NAME};
use crate::error::ServiceError;
use eventsource_stream::Eventsource;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings for the Gemini runtime
#[derive(Debug, Clone)]
pub struct GeminiAgentConfig {
    pub api_key: String,
    pub model: String,
    /// System instruction given to the agent on every run
    pub instruction: String,
    pub base_url: String,
}

/// Agent runtime backed by the Gemini generative language API
pub struct GeminiAgent {
    client: Client,
    config: GeminiAgentConfig,
    sessions: Arc<dyn SessionStore>,
}

impl GeminiAgent {
    pub fn new(
        client: Client,
        config: GeminiAgentConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            client,
            config,
            sessions,
        }
    }

    fn stream_endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn translate_request(&self, message: &Content) -> GeminiRequest {
        let role = match message.role {
            ContentRole::User => "user",
            ContentRole::Model => "model",
        };

        let parts = message
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text: Some(text) } => Some(GeminiPart {
                    text: Some(text.clone()),
                    function_call: None,
                }),
                Part::Text { text: None } => None,
                Part::FunctionCall { name, args } => Some(GeminiPart {
                    text: None,
                    function_call: Some(GeminiFunctionCall {
                        name: name.clone(),
                        args: Some(args.clone()),
                    }),
                }),
            })
            .collect();

        let system_instruction = if self.config.instruction.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(self.config.instruction.clone()),
                    function_call: None,
                }],
            })
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some(role.to_string()),
                parts,
            }],
            system_instruction,
        }
    }
}

impl AgentRuntime for GeminiAgent {
    fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: Content,
        mode: StreamingMode,
    ) -> AgentEventStream {
        let client = self.client.clone();
        let sessions = self.sessions.clone();
        let api_key = self.config.api_key.clone();
        let model = self.config.model.clone();
        let url = self.stream_endpoint();
        let request = self.translate_request(&message);
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();

        let start = async move {
            if !sessions.session_exists(APP_NAME, &user_id, &session_id).await? {
                return Err(ServiceError::invalid_request(format!(
                    "Session not found: {session_id}"
                )));
            }

            tracing::info!(model = %model, session_id = %session_id, ?mode, "Starting agent run");

            let response = client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| ServiceError::from_reqwest(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::from_status(
                    status.as_u16(),
                    error_message(&body),
                ));
            }

            let events: AgentEventStream = response
                .bytes_stream()
                .eventsource()
                .map(|item| match item {
                    Ok(sse) => parse_chunk(&sse.data),
                    Err(e) => Err(ServiceError::network(format!("SSE stream error: {e}"))),
                })
                .boxed();
            Ok(events)
        };

        futures::stream::once(start).try_flatten().boxed()
    }
}

/// Turn one response chunk into an agent event
fn parse_chunk(data: &str) -> Result<AgentEvent, ServiceError> {
    let chunk: GeminiResponse = serde_json::from_str(data).map_err(|e| {
        ServiceError::unknown(format!("Failed to parse response chunk: {e} - data: {data}"))
    })?;

    if let Some(error) = chunk.error {
        return Err(ServiceError::from_status(
            u16::try_from(error.code.unwrap_or(500)).unwrap_or(500),
            error.message,
        ));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ServiceError::invalid_request(format!(
                "Prompt blocked: {reason}"
            )));
        }
        return Ok(AgentEvent::default());
    };

    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .map(|part| match part.function_call {
            Some(call) => Part::FunctionCall {
                name: call.name,
                args: call.args.unwrap_or_default(),
            },
            None => Part::Text { text: part.text },
        })
        .collect();

    Ok(AgentEvent {
        parts,
        final_response: candidate.finish_reason.is_some(),
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|resp| resp.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    code: Option<i64>,
}
