//! Session domain model.

use crate::incident::{Incident, IncidentStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Idle time after which a session is logically absent, in seconds.
///
/// Expiry is lazy: a session past this threshold is treated as missing on next
/// access even if a background sweep has not removed it yet.
pub const SESSION_TTL_SECS: i64 = 5 * 60;

/// Step of the multi-turn command a session is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    /// Waiting for a 1-based pick from the presented task list
    SelectTask,
    /// Waiting for a progress note or the literal `complete`
    ProvideUpdate,
    /// Waiting for `yes` / `no` to finalize completion
    ConfirmCompletion,
}

/// A lightweight handle to a task shown in a numbered list.
///
/// Sessions carry these instead of full records so that the follow-up reply
/// can re-resolve the record fresh at apply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub description: String,
    pub status: IncidentStatus,
}

impl TaskRef {
    pub fn from_incident(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            description: incident.description.clone(),
            status: incident.status,
        }
    }
}

/// Step-scoped session data.
///
/// `candidates` is the numbered list presented at `SelectTask`; `selected` is
/// populated once the sender picks one and carries through the remaining steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default)]
    pub candidates: Vec<TaskRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<TaskRef>,
}

impl SessionPayload {
    pub fn with_candidates(candidates: Vec<TaskRef>) -> Self {
        Self {
            candidates,
            selected: None,
        }
    }
}

/// Per-sender conversational state for a multi-step command.
///
/// Invariant: at most one session exists per phone number at a time; creating
/// a new one replaces any prior session for that sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Sender phone number (session key)
    pub phone: String,
    /// Current step
    pub step: SessionStep,
    /// Step-scoped data
    pub payload: SessionPayload,
    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last activity (creation or follow-up)
    pub last_activity_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Creates a new session starting at the given step.
    pub fn new(phone: impl Into<String>, step: SessionStep, payload: SessionPayload) -> Self {
        let now = Utc::now();
        Self {
            phone: phone.into(),
            step,
            payload,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Whether this session has been idle past the TTL as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity_at >= Duration::seconds(SESSION_TTL_SECS)
    }

    /// Refreshes the activity timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }
}
