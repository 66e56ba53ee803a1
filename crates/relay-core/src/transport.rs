//! Outbound message transport trait.
//!
//! The transport (the WhatsApp Business API client) lives outside this
//! subsystem; sends are fire-and-forget from the engine's perspective and any
//! retry policy belongs to the implementation.

use crate::error::Result;
use async_trait::async_trait;

/// Receipt for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Transport-assigned message ID
    pub message_id: String,
}

/// An abstract outbound message transport.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Sends a plain-text message to the phone number.
    ///
    /// # Returns
    ///
    /// - `Ok(SendReceipt)`: Message accepted by the transport
    /// - `Err(RelayError::Transport)`: Delivery failed; callers must surface
    ///   this rather than swallow it
    async fn send(&self, phone: &str, text: &str) -> Result<SendReceipt>;
}
