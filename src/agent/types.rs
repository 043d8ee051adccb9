//! Common types for agent runtime interactions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a content unit submitted to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// A single content unit (one turn) sent to the agent runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    /// Wrap plain text as a user-authored content unit
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::text(text)],
        }
    }
}

/// Part of an agent event or content unit
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Text fragment. Providers occasionally send parts with no text at all.
    Text { text: Option<String> },
    FunctionCall {
        name: String,
        args: Map<String, Value>,
    },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text {
            text: Some(s.into()),
        }
    }
}

#[cfg(test)]
impl Part {
    pub fn function_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Part::FunctionCall {
            name: name.into(),
            args,
        }
    }
}

/// How the runtime delivers its output. Only token-level streaming is
/// requested by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingMode {
    /// Incremental, token-level delivery over SSE
    #[default]
    Sse,
}

/// One event produced by the agent runtime during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentEvent {
    pub parts: Vec<Part>,
    pub final_response: bool,
}

impl AgentEvent {
    /// Non-empty text fragments in arrival order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Text { text: Some(text) } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }

    /// Function invocations in arrival order
    pub fn function_calls(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall { name, args } => Some((name.as_str(), args)),
            Part::Text { .. } => None,
        })
    }

    pub fn is_final_response(&self) -> bool {
        self.final_response
    }
}

#[cfg(test)]
impl AgentEvent {
    /// Event carrying a single text fragment
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            final_response: false,
        }
    }

    /// Event carrying a single function invocation
    pub fn function_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            parts: vec![Part::function_call(name, args)],
            final_response: false,
        }
    }

    /// Bare final-response marker with no payload
    pub fn final_marker() -> Self {
        Self {
            parts: Vec::new(),
            final_response: true,
        }
    }

    #[must_use]
    pub fn into_final(mut self) -> Self {
        self.final_response = true;
        self
    }
}
