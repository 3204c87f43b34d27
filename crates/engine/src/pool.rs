//! Session pool
//!
//! Maps session ids to their [`SessionContext`]. Each context sits behind an
//! async mutex: independent sessions run concurrently, turns of one session
//! run one at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::registry::SessionContext;

/// One pooled conversation
#[derive(Debug)]
pub struct PooledSession {
    id: String,
    context: Mutex<SessionContext>,
    last_activity: RwLock<Instant>,
}

impl PooledSession {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: Mutex::new(SessionContext::new()),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exclusive access to the session's forms for one turn
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, SessionContext> {
        self.touch();
        self.context.lock().await
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_idle(&self, max_idle: Duration) -> bool {
        self.last_activity.read().elapsed() > max_idle
    }
}

/// Session contexts keyed by session id
#[derive(Debug, Default)]
pub struct SessionPool {
    sessions: RwLock<HashMap<String, Arc<PooledSession>>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session under a fresh id
    pub fn create(&self) -> Arc<PooledSession> {
        self.get_or_create(&uuid::Uuid::new_v4().to_string())
    }

    pub fn get_or_create(&self, id: &str) -> Arc<PooledSession> {
        if let Some(session) = self.get(id) {
            return session;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Created session");
                Arc::new(PooledSession::new(id))
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<PooledSession>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop sessions idle for longer than `max_idle`; returns how many went
    pub fn cleanup_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_idle(max_idle));

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Cleaned up idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_reuses() {
        let pool = SessionPool::new();
        let a = pool.get_or_create("s1");
        let b = pool.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.count(), 1);

        let fresh = pool.create();
        assert_ne!(fresh.id(), "s1");
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_remove() {
        let pool = SessionPool::new();
        pool.get_or_create("s1");
        assert!(pool.remove("s1"));
        assert!(!pool.remove("s1"));
        assert!(pool.get("s1").is_none());
    }

    #[tokio::test]
    async fn test_cleanup_idle() {
        let pool = SessionPool::new();
        pool.get_or_create("old");
        tokio::time::sleep(Duration::from_millis(30)).await;
        pool.get_or_create("new");

        assert_eq!(pool.cleanup_idle(Duration::from_millis(20)), 1);
        assert!(pool.get("old").is_none());
        assert!(pool.get("new").is_some());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_session() {
        let pool = SessionPool::new();
        let session = pool.get_or_create("s1");

        let guard = session.lock().await;
        assert!(session.context.try_lock().is_err());
        drop(guard);
        assert!(session.context.try_lock().is_ok());
    }
}
