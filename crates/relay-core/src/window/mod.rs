//! Messaging-window economics module.
//!
//! WhatsApp Business billing makes replies free only inside the 24-hour window
//! opened by a sender-initiated message. This module tracks that window per
//! sender and classifies whether a proactive send is free right now or should
//! be deferred.
//!
//! # Module Structure
//!
//! - `model`: per-sender window tracker
//! - `store`: store trait for tracker persistence
//! - `economics`: pure classification and mutation rules

mod economics;
mod model;
mod store;

pub use economics::{
    analyze, apply, next_business_slot, Direction, SendDecision, SendReason,
    FREE_WINDOW_MESSAGE_CAP, MEDIA_MESSAGE_COST_USD, TEXT_MESSAGE_COST_USD, WINDOW_HOURS,
};
pub use model::WindowTracker;
pub use store::WindowStore;
