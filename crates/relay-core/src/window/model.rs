//! Window tracker domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-sender rolling free-messaging-window state.
///
/// Created on first contact with a sender and mutated on every inbound or
/// outbound message. Trackers are never explicitly destroyed; an idle tracker
/// is harmless.
///
/// Invariant: `is_window_active` implies `now - window_start < 24h`. The flag
/// is refreshed by [`super::apply`] on every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTracker {
    /// Sender phone number (tracker key)
    pub phone: String,
    /// Start of the current 24-hour window
    pub window_start: DateTime<Utc>,
    /// Outbound messages sent inside the current window
    pub message_count: u32,
    /// Timestamp of the most recent message in either direction
    pub last_message: DateTime<Utc>,
    /// Whether the window was open as of the last mutation
    pub is_window_active: bool,
}

impl WindowTracker {
    /// Opens a fresh window for the sender, as happens on any
    /// sender-initiated inbound message.
    pub fn new_window(phone: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            phone: phone.into(),
            window_start: now,
            message_count: 0,
            last_message: now,
            is_window_active: true,
        }
    }
}
