use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::chat::SessionId;

use super::types::ConversationState;

/// A cached session. Creation time lives outside the lock so expiry checks
/// never contend with an in-flight turn.
#[derive(Clone)]
struct SessionEntry {
    created_at: Instant,
    state: Arc<Mutex<ConversationState>>,
}

/// Thread-safe in-memory session cache. Each state sits behind its own async
/// mutex, which serializes turns for one session while the server keeps
/// processing other sessions.
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<DashMap<SessionId, SessionEntry>>,
    ttl: Duration,
    max_sessions: usize,
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
}

impl SessionCache {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        info!(
            "Initializing session cache: ttl={:?}, max_sessions={}",
            ttl, max_sessions
        );
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
            max_sessions,
        }
    }

    /// Get a session by id. Expired sessions are removed lazily.
    pub fn get(&self, session_id: SessionId) -> Option<Arc<Mutex<ConversationState>>> {
        let entry = self.storage.get(&session_id)?;
        if entry.created_at.elapsed() > self.ttl {
            drop(entry);
            self.storage.remove(&session_id);
            debug!("Session {} expired, removed from cache", session_id);
            return None;
        }
        Some(entry.state.clone())
    }

    /// Create and store a fresh session. Fails when the cache is full.
    pub fn create(&self, session_id: SessionId) -> anyhow::Result<Arc<Mutex<ConversationState>>> {
        if self.storage.len() >= self.max_sessions {
            let evicted = self.cleanup_expired();
            if evicted == 0 {
                warn!(
                    "Session cache full ({} sessions), rejecting new session",
                    self.max_sessions
                );
                anyhow::bail!("session limit reached, cannot create new session");
            }
        }

        let state = Arc::new(Mutex::new(ConversationState::new(session_id)));
        self.storage.insert(
            session_id,
            SessionEntry {
                created_at: Instant::now(),
                state: state.clone(),
            },
        );
        debug!("Created session {}", session_id);
        Ok(state)
    }

    pub fn remove(&self, session_id: SessionId) {
        self.storage.remove(&session_id);
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop every expired session. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.storage.len();
        let ttl = self.ttl;
        self.storage
            .retain(|_, entry| entry.created_at.elapsed() <= ttl);
        let removed = before.saturating_sub(self.storage.len());
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            active_sessions: self.len(),
            max_sessions: self.max_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let cache = SessionCache::new(Duration::from_secs(60), 10);
        let id = SessionId::new_v4();
        cache.create(id).unwrap();
        assert!(cache.get(id).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_unknown_session() {
        let cache = SessionCache::new(Duration::from_secs(60), 10);
        assert!(cache.get(SessionId::new_v4()).is_none());
    }

    #[test]
    fn test_expired_session_is_lazily_evicted() {
        let cache = SessionCache::new(Duration::ZERO, 10);
        let id = SessionId::new_v4();
        cache.create(id).unwrap();
        assert!(cache.get(id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = SessionCache::new(Duration::from_secs(60), 2);
        cache.create(SessionId::new_v4()).unwrap();
        cache.create(SessionId::new_v4()).unwrap();
        assert!(cache.create(SessionId::new_v4()).is_err());
    }

    #[test]
    fn test_full_cache_evicts_expired_before_rejecting() {
        let cache = SessionCache::new(Duration::ZERO, 1);
        cache.create(SessionId::new_v4()).unwrap();
        // first entry is already expired, so the next create succeeds
        assert!(cache.create(SessionId::new_v4()).is_ok());
    }
}
