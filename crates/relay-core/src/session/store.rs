//! Session store trait.
//!
//! Defines the interface for session state persistence. The store is injected
//! into the dispatcher and session flow rather than accessed as a singleton,
//! so ownership and lifetime are explicit and testable.

use super::model::{ConversationSession, SessionPayload, SessionStep};
use crate::error::Result;
use async_trait::async_trait;

/// Partial update applied to an existing session.
///
/// Unset fields leave the current value in place; every applied patch
/// refreshes `last_activity_at`.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub step: Option<SessionStep>,
    pub payload: Option<SessionPayload>,
}

impl SessionPatch {
    /// Patch that only moves the session to another step.
    pub fn step(step: SessionStep) -> Self {
        Self {
            step: Some(step),
            payload: None,
        }
    }

    /// Patch that moves step and replaces the payload.
    pub fn step_with_payload(step: SessionStep, payload: SessionPayload) -> Self {
        Self {
            step: Some(step),
            payload: Some(payload),
        }
    }
}

/// An abstract store for per-sender conversational sessions.
///
/// # Implementation Notes
///
/// Implementations must enforce at most one session per phone number and must
/// treat TTL-expired sessions as absent (lazily evicting them on access).
/// Individual operations must be atomic; cross-operation read-modify-write
/// interleaving between near-simultaneous messages from the same sender is a
/// documented limitation, not defended against here.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates (or replaces) the session for the session's phone number.
    async fn create(&self, session: ConversationSession) -> Result<()>;

    /// Returns the live session for the phone number.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: Active, unexpired session
    /// - `Ok(None)`: No session, or the session had expired (evicted)
    /// - `Err(_)`: Error occurred during retrieval
    async fn get(&self, phone: &str) -> Result<Option<ConversationSession>>;

    /// Applies a patch to the live session, refreshing its activity timestamp.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: The patched session
    /// - `Ok(None)`: No live session to patch
    async fn update(&self, phone: &str, patch: SessionPatch) -> Result<Option<ConversationSession>>;

    /// Removes the session for the phone number, if any.
    async fn clear(&self, phone: &str) -> Result<()>;

    /// Whether the phone number currently holds a live session.
    async fn has_active(&self, phone: &str) -> Result<bool>;
}
