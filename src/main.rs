//! chat_relay - streaming chat gateway
//!
//! Accepts a chat conversation over HTTP, optionally grounds the latest
//! question in vector-index context, runs it through a Gemini agent and
//! relays the agent's output to the browser as Server-Sent Events.

mod agent;
mod api;
mod config;
mod error;
mod pipeline;
mod prompt;
mod retrieval;
mod stream;

use agent::{AgentSessionBridge, GeminiAgent, GeminiAgentConfig, InMemorySessionStore};
use api::{create_router, AppState};
use axum::http::{header, HeaderValue, Method};
use config::RelayConfig;
use pipeline::{ChatPipeline, RetrievalStage};
use retrieval::{ContextRetriever, GeminiEmbedder, LoggingEmbedder, QdrantIndex};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = RelayConfig::from_env();

    let api_key = config.gemini_api_key.clone().unwrap_or_else(|| {
        tracing::warn!("No Gemini API key configured. Set GEMINI_API_KEY or GOOGLE_API_KEY.");
        String::new()
    });

    // No overall request timeout: agent streams are bounded by the idle timeout
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    // Agent runtime and its session store
    let sessions = Arc::new(InMemorySessionStore::new(config.session_ttl));
    let agent = GeminiAgent::new(
        client.clone(),
        GeminiAgentConfig {
            api_key: api_key.clone(),
            model: config.agent_model.clone(),
            instruction: config.agent_instruction.clone(),
            base_url: config.gemini_base_url.clone(),
        },
        sessions.clone(),
    );
    let bridge = AgentSessionBridge::new(Arc::new(agent), sessions, config.request_timeout);

    // Retrieval augmentation, when a vector index is configured
    let retrieval = config.qdrant.as_ref().map(|qdrant| {
        tracing::info!(
            url = %qdrant.url,
            collection = %qdrant.collection,
            limit = config.retrieval_limit.get(),
            "Retrieval augmentation enabled"
        );
        let embedder = GeminiEmbedder::new(client.clone(), api_key.clone(), &config.gemini_base_url);
        RetrievalStage {
            retriever: ContextRetriever::new(
                Arc::new(LoggingEmbedder::new(Arc::new(embedder))),
                Arc::new(QdrantIndex::new(
                    client.clone(),
                    &qdrant.url,
                    qdrant.api_key.clone(),
                )),
                config.embedding_model.clone(),
                qdrant.collection.clone(),
                config.request_timeout,
            ),
            limit: config.retrieval_limit,
        }
    });
    if !config.retrieval_enabled() {
        tracing::info!("No vector index configured, forwarding questions unchanged");
    }

    let pipeline = ChatPipeline::new(retrieval, bridge, config.agent_idle_timeout);
    let state = AppState::new(pipeline);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(model = %config.agent_model, "chat_relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
