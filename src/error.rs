//! Error types for upstream services and the chat pipeline

use thiserror::Error;

/// Upstream service error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidRequest, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from an upstream service
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::invalid_request(format!("Invalid request: {message}")),
            401 | 403 => Self::auth(format!("Authentication failed: {message}")),
            408 => Self::timeout(format!("Upstream timeout: {message}")),
            429 => Self::rate_limit(format!("Rate limit exceeded: {message}")),
            500..=599 => Self::server_error(format!("Server error: {message}")),
            _ => Self::unknown(format!("HTTP {status}: {message}")),
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Network issues, dropped connections
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Deadline exceeded, either upstream or at our own boundary
    Timeout,
    /// Unknown error
    Unknown,
}

impl ServiceErrorKind {
    pub fn is_timeout(self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Failures that abort a chat call before its stream opens
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("embedding failed: {0}")]
    Embedding(ServiceError),
    #[error("vector index query failed: {0}")]
    Retrieval(ServiceError),
    #[error("session creation failed: {0}")]
    Session(ServiceError),
}

impl PipelineError {
    pub fn source_error(&self) -> &ServiceError {
        match self {
            Self::Embedding(e) | Self::Retrieval(e) | Self::Session(e) => e,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.source_error().kind.is_timeout()
    }
}
