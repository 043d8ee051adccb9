//! In-memory session store with idle eviction

use super::SessionStore;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Upper bound on how long expired sessions linger before a sweep
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Sessions {
    entries: HashMap<SessionKey, Instant>,
    last_sweep: Instant,
}

/// Process-local session store.
///
/// Sessions are never deleted by callers. Entries older than the TTL are
/// invisible to lookups and are swept on creation, at most once per sweep
/// interval (or per TTL, if shorter).
pub struct InMemorySessionStore {
    sessions: RwLock<Sessions>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(Sessions {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
            sweep_interval: ttl.min(SWEEP_INTERVAL),
        }
    }

    fn is_live(&self, created: Instant) -> bool {
        created.elapsed() < self.ttl
    }

    /// Number of sessions currently held, including expired ones not yet swept
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.entries.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), ServiceError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.write().await;

        if sessions.last_sweep.elapsed() >= self.sweep_interval {
            let before = sessions.entries.len();
            sessions.entries.retain(|_, created| self.is_live(*created));
            sessions.last_sweep = Instant::now();
            let evicted = before - sessions.entries.len();
            if evicted > 0 {
                tracing::debug!(
                    evicted,
                    remaining = sessions.entries.len(),
                    "Evicted expired sessions"
                );
            }
        }

        let taken = sessions
            .entries
            .get(&key)
            .is_some_and(|created| self.is_live(*created));
        if taken {
            return Err(ServiceError::invalid_request(format!(
                "Session {session_id} already exists"
            )));
        }
        sessions.entries.insert(key, Instant::now());
        Ok(())
    }

    async fn session_exists(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<bool, ServiceError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let sessions = self.sessions.read().await;
        Ok(sessions
            .entries
            .get(&key)
            .is_some_and(|created| self.is_live(*created)))
    }
}
