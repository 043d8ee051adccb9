//! HTTP request handlers

use super::sse::sse_response;
use super::types::{ChatRequest, ErrorResponse, HealthResponse};
use super::AppState;
use crate::error::PipelineError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Streaming chat
        .route("/chat", post(chat))
        // Liveness
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Streaming Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let Some(question) = req.last_user_message() else {
        tracing::info!(
            messages = req.messages.len(),
            "No user message in request, closing empty stream"
        );
        return Ok(sse_response(futures::stream::empty()));
    };

    let events = state.pipeline.start(question).await?;
    Ok(sse_response(events))
}

// ============================================================
// Health & Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        retrieval: state.pipeline.retrieval_enabled(),
    })
}

async fn get_version() -> &'static str {
    concat!("chat_relay ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadGateway(String),
    GatewayTimeout(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        tracing::error!(error = %e, "Chat request failed before streaming");
        if e.is_timeout() {
            AppError::GatewayTimeout(e.to_string())
        } else {
            AppError::BadGateway(e.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
