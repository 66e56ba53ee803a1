//! Conversational session domain module.
//!
//! A session is short-lived per-sender state tracking a multi-step command in
//! progress over WhatsApp.
//!
//! # Module Structure
//!
//! - `model`: session entity, step enum, and the typed step payload
//! - `store`: store trait for session persistence with TTL semantics

mod model;
mod store;

pub use model::{ConversationSession, SessionPayload, SessionStep, TaskRef, SESSION_TTL_SECS};
pub use store::{SessionPatch, SessionStore};
