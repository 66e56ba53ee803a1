//! Window economics rules.
//!
//! Pure functions over [`WindowTracker`]: classification of whether a send is
//! free right now, tracker mutation per message, and the deferred-send slot
//! heuristic for paid-classified recipients. Everything takes `now` explicitly
//! so tests need no clock mocking.

use super::model::WindowTracker;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

/// Length of the customer-initiated free window.
pub const WINDOW_HOURS: i64 = 24;

/// Outbound messages allowed inside one window before sends are classified
/// as paid.
pub const FREE_WINDOW_MESSAGE_CAP: u32 = 1000;

/// Flat estimated cost for a paid text message, in USD.
pub const TEXT_MESSAGE_COST_USD: f64 = 0.005;

/// Flat estimated cost for a paid media message, in USD.
pub const MEDIA_MESSAGE_COST_USD: f64 = 0.015;

/// Why a send was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendReason {
    /// Sender-initiated inbound message restarts the window
    NewWindow,
    /// Inside an open window with capacity left
    FreeWindow,
    /// Outside the window, or over the message cap
    PaidRequired,
}

/// Outcome of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendDecision {
    pub send_now: bool,
    pub reason: SendReason,
    /// Minutes left in the open window, when `reason` is `FreeWindow`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes_remaining: Option<i64>,
    /// Estimated per-message cost, when `reason` is `PaidRequired`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost_usd: Option<f64>,
}

/// Direction of the message being recorded against a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

fn window_open(tracker: &WindowTracker, now: DateTime<Utc>) -> bool {
    now - tracker.window_start < Duration::hours(WINDOW_HOURS)
}

/// Classifies whether a message to this sender can go out free right now.
///
/// A sender-initiated inbound always yields `send_now` with `NewWindow`.
/// Otherwise the send is free while the window is open and the cap is not
/// exhausted; anything else is `PaidRequired` with a flat cost estimate
/// (higher for media). A missing tracker (`None`) means first contact with no
/// open window, which is also paid.
pub fn analyze(
    tracker: Option<&WindowTracker>,
    sender_initiated: bool,
    is_media: bool,
    now: DateTime<Utc>,
) -> SendDecision {
    if sender_initiated {
        return SendDecision {
            send_now: true,
            reason: SendReason::NewWindow,
            window_minutes_remaining: None,
            estimated_cost_usd: None,
        };
    }

    if let Some(tracker) = tracker {
        if window_open(tracker, now) && tracker.message_count < FREE_WINDOW_MESSAGE_CAP {
            let closes_at = tracker.window_start + Duration::hours(WINDOW_HOURS);
            return SendDecision {
                send_now: true,
                reason: SendReason::FreeWindow,
                window_minutes_remaining: Some((closes_at - now).num_minutes()),
                estimated_cost_usd: None,
            };
        }
    }

    SendDecision {
        send_now: false,
        reason: SendReason::PaidRequired,
        window_minutes_remaining: None,
        estimated_cost_usd: Some(if is_media {
            MEDIA_MESSAGE_COST_USD
        } else {
            TEXT_MESSAGE_COST_USD
        }),
    }
}

/// Records one message against a tracker and returns the new state.
///
/// A sender-initiated inbound message restarts the window unconditionally
/// (`window_start = now`, `message_count = 0`). Outbound messages increment
/// the count only while the window is open. A missing tracker is created on
/// first contact.
pub fn apply(
    tracker: Option<WindowTracker>,
    phone: &str,
    sender_initiated: bool,
    direction: Direction,
    now: DateTime<Utc>,
) -> WindowTracker {
    if sender_initiated && direction == Direction::Inbound {
        return WindowTracker::new_window(phone, now);
    }

    let mut tracker = tracker.unwrap_or_else(|| WindowTracker {
        phone: phone.to_string(),
        window_start: now,
        message_count: 0,
        last_message: now,
        is_window_active: false,
    });

    let open = window_open(&tracker, now);
    if direction == Direction::Outbound && open {
        tracker.message_count += 1;
    }
    tracker.is_window_active = open;
    tracker.last_message = now;
    tracker
}

/// Next "likely business hours" send slot: 09:00 the following day in the
/// caller's timezone.
///
/// This is a cost-avoidance nudge for bulk sends to paid-classified
/// recipients, not a delivery guarantee.
pub fn next_business_slot<Tz: TimeZone>(now: DateTime<Tz>) -> DateTime<Tz> {
    let tomorrow = now.date_naive() + Duration::days(1);
    let slot = tomorrow.and_hms_opt(9, 0, 0).unwrap_or_else(|| {
        // 09:00 always exists; fallback keeps the signature total anyway.
        tomorrow.and_hms_opt(12, 0, 0).unwrap()
    });
    match now.timezone().from_local_datetime(&slot) {
        chrono::LocalResult::Single(at) | chrono::LocalResult::Ambiguous(at, _) => at,
        chrono::LocalResult::None => now + Duration::days(1),
    }
}
