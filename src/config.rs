//! Environment-derived configuration

use crate::agent::DEFAULT_GEMINI_BASE_URL;
use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_AGENT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_AGENT_INSTRUCTION: &str = "You are a helpful assistant.";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Vector index connection; its presence turns on retrieval augmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub cors_origin: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub agent_model: String,
    pub agent_instruction: String,
    pub embedding_model: String,
    pub qdrant: Option<QdrantConfig>,
    pub retrieval_limit: NonZeroUsize,
    /// Bound on each pre-stream call (embedding, vector query, session creation)
    pub request_timeout: Duration,
    /// Bound on the gap between consecutive agent events
    pub agent_idle_timeout: Duration,
    pub session_ttl: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            agent_model: DEFAULT_AGENT_MODEL.to_string(),
            agent_instruction: DEFAULT_AGENT_INSTRUCTION.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            qdrant: None,
            retrieval_limit: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            request_timeout: Duration::from_secs(30),
            agent_idle_timeout: Duration::from_secs(120),
            session_ttl: Duration::from_secs(3600),
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let qdrant = match (get("QDRANT_URL"), get("QDRANT_COLLECTION")) {
            (Some(url), Some(collection)) => Some(QdrantConfig {
                url,
                api_key: get("QDRANT_API_KEY"),
                collection,
            }),
            (Some(_), None) => {
                tracing::warn!("QDRANT_URL set without QDRANT_COLLECTION; retrieval disabled");
                None
            }
            _ => None,
        };

        Self {
            port: parse_or(get("CHAT_RELAY_PORT"), "CHAT_RELAY_PORT", defaults.port),
            cors_origin: get("CHAT_RELAY_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            agent_model: get("AGENT_MODEL").unwrap_or(defaults.agent_model),
            agent_instruction: get("AGENT_INSTRUCTION").unwrap_or(defaults.agent_instruction),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            qdrant,
            retrieval_limit: parse_or(
                get("RETRIEVAL_LIMIT"),
                "RETRIEVAL_LIMIT",
                defaults.retrieval_limit,
            ),
            request_timeout: secs_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout,
            ),
            agent_idle_timeout: secs_or(
                get("AGENT_IDLE_TIMEOUT_SECS"),
                "AGENT_IDLE_TIMEOUT_SECS",
                defaults.agent_idle_timeout,
            ),
            session_ttl: secs_or(
                get("SESSION_TTL_SECS"),
                "SESSION_TTL_SECS",
                defaults.session_ttl,
            ),
        }
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.qdrant.is_some()
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

fn secs_or(value: Option<String>, name: &str, default: Duration) -> Duration {
    match parse_or::<u64>(value, name, 0) {
        0 => default,
        secs => Duration::from_secs(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RelayConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelayConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.agent_model, "gemini-2.0-flash");
        assert_eq!(cfg.agent_instruction, "You are a helpful assistant.");
        assert_eq!(cfg.retrieval_limit.get(), 3);
        assert_eq!(cfg.cors_origin, "http://localhost:3000");
        assert!(cfg.gemini_api_key.is_none());
        assert!(!cfg.retrieval_enabled());
    }

    #[test]
    fn test_google_key_fallback() {
        assert_eq!(
            config(&[("GOOGLE_API_KEY", "g")]).gemini_api_key.as_deref(),
            Some("g")
        );
        assert_eq!(
            config(&[("GOOGLE_API_KEY", "g"), ("GEMINI_API_KEY", "m")])
                .gemini_api_key
                .as_deref(),
            Some("m")
        );
        assert!(config(&[("GEMINI_API_KEY", "  ")]).gemini_api_key.is_none());
    }

    #[test]
    fn test_qdrant_requires_url_and_collection() {
        assert!(!config(&[("QDRANT_URL", "http://q:6333")]).retrieval_enabled());
        let cfg = config(&[
            ("QDRANT_URL", "http://q:6333"),
            ("QDRANT_COLLECTION", "docs"),
            ("QDRANT_API_KEY", "secret"),
        ]);
        assert_eq!(
            cfg.qdrant,
            Some(QdrantConfig {
                url: "http://q:6333".to_string(),
                api_key: Some("secret".to_string()),
                collection: "docs".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let cfg = config(&[
            ("CHAT_RELAY_PORT", "http"),
            ("RETRIEVAL_LIMIT", "0"),
            ("REQUEST_TIMEOUT_SECS", "-1"),
            ("AGENT_IDLE_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.retrieval_limit.get(), 3);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.agent_idle_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("CHAT_RELAY_PORT", "9090"),
            ("RETRIEVAL_LIMIT", "7"),
            ("AGENT_IDLE_TIMEOUT_SECS", "15"),
            ("EMBEDDING_MODEL", "gemini-embedding-001"),
        ]);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.retrieval_limit.get(), 7);
        assert_eq!(cfg.agent_idle_timeout, Duration::from_secs(15));
        assert_eq!(cfg.embedding_model, "gemini-embedding-001");
    }
}
