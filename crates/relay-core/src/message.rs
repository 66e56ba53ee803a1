//! Inbound message types.
//!
//! Each WhatsApp message kind gets its own variant so the dispatcher consumes
//! deliveries via exhaustive pattern matching instead of probing dynamic
//! payload fields.

use serde::{Deserialize, Serialize};

/// An already-parsed inbound message from the webhook layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Plain text
    Text { body: String },
    /// Image with optional caption
    Image {
        media_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Shared location pin
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Voice note or audio file
    Audio { media_id: String },
    /// Anything the webhook layer recognized but this engine does not handle
    Unsupported {
        #[serde(rename = "message_kind")]
        kind: String,
    },
}

impl InboundMessage {
    /// Convenience constructor for the common case.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let msg = InboundMessage::text("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""kind":"text""#));
        let back: InboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
