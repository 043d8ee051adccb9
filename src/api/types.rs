//! API request and response types

use serde::{Deserialize, Serialize};

/// Author of a chat message. Roles are matched exactly; anything that is not
/// one of the known names (including `"User"`) is kept as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    #[serde(other)]
    Other,
}

/// One turn of the conversation as sent by the client
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request to stream a chat response
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Content of the last user message. Earlier turns are not consulted.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub retrieval: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
