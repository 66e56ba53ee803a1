//! In-process SessionStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use relay_core::error::Result;
use relay_core::session::{ConversationSession, SessionPatch, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Session store backed by an in-process concurrent map.
///
/// Expired sessions are evicted lazily on access; [`start_sweeper`] adds a
/// periodic sweep so abandoned sessions do not linger for the process
/// lifetime. Each operation is atomic behind the lock, but two
/// near-simultaneous messages from one sender can still interleave across
/// operations (documented limitation of the engine, not defended against
/// here).
///
/// [`start_sweeper`]: InMemorySessionStore::start_sweeper
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, ConversationSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired session, returning how many were evicted.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    /// Starts a background task sweeping expired sessions at the given
    /// interval. Only one sweeper runs per process.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        static SWEEPER_RUNNING: AtomicBool = AtomicBool::new(false);
        if SWEEPER_RUNNING.swap(true, Ordering::SeqCst) {
            tracing::warn!("[SessionSweeper] Sweeper already running, skipping");
            return;
        }

        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            tracing::info!(target: "session_sweeper", "Sweeper started ({:?} interval)", interval);
            loop {
                ticker.tick().await;
                let evicted = store.sweep_expired().await;
                if evicted > 0 {
                    tracing::debug!(target: "session_sweeper", "Evicted {} expired sessions", evicted);
                }
            }
        });
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: ConversationSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        // Replaces any prior session: at most one per sender.
        sessions.insert(session.phone.clone(), session);
        Ok(())
    }

    async fn get(&self, phone: &str) -> Result<Option<ConversationSession>> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(phone) {
                Some(session) if !session.is_expired(now) => return Ok(Some(session.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: evict under the write lock, re-checking expiry in case a
        // concurrent update touched it in between.
        let mut sessions = self.sessions.write().await;
        if sessions.get(phone).is_some_and(|s| s.is_expired(now)) {
            sessions.remove(phone);
        }
        Ok(None)
    }

    async fn update(
        &self,
        phone: &str,
        patch: SessionPatch,
    ) -> Result<Option<ConversationSession>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(phone) {
            Some(session) if !session.is_expired(now) => {
                if let Some(step) = patch.step {
                    session.step = step;
                }
                if let Some(payload) = patch.payload {
                    session.payload = payload;
                }
                session.touch(now);
                Ok(Some(session.clone()))
            }
            Some(_) => {
                sessions.remove(phone);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn clear(&self, phone: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(phone);
        Ok(())
    }

    async fn has_active(&self, phone: &str) -> Result<bool> {
        Ok(self.get(phone).await?.is_some())
    }
}
