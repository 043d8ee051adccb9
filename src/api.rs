//! HTTP surface of the relay
//!
//! `POST /chat` streams wire events as SSE; `/health` and `/version` are
//! plain liveness checks.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::pipeline::ChatPipeline;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
}

impl AppState {
    pub fn new(pipeline: ChatPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
