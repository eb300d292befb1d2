//! Wire message envelope.
//!
//! Clients exchange a flat JSON record. The server never trusts the
//! client-supplied routing fields: `type` and `channel_id` are overwritten
//! on receipt, and a missing timestamp is stamped at ingress.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Canonical value of the `type` field on broadcast messages.
pub const MESSAGE_TYPE: &str = "message";

/// The JSON envelope exchanged with clients.
///
/// Unknown fields are ignored on deserialization; missing fields default to
/// empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message kind; informational, forced to `"message"` on receipt.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Target channel; forced to the connection's bound channel on receipt.
    #[serde(default)]
    pub channel_id: String,
    /// Sender display name, passed through.
    #[serde(default)]
    pub author: String,
    /// Message body, passed through.
    #[serde(default)]
    pub content: String,
    /// RFC 3339 creation time; stamped with current UTC time when empty.
    #[serde(default)]
    pub created_at: String,
}

impl WireMessage {
    /// Rewrite the routing fields for broadcast from a bound connection.
    ///
    /// The channel is bound at connection time, so any client-supplied
    /// `channel_id` is discarded rather than honored.
    #[must_use]
    pub fn canonicalize(mut self, bound_channel: &str) -> Self {
        self.kind = MESSAGE_TYPE.to_string();
        self.channel_id = bound_channel.to_string();
        if self.created_at.is_empty() {
            self.created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_overwrites_routing_fields() {
        let msg = WireMessage {
            kind: "publish".to_string(),
            channel_id: "somewhere-else".to_string(),
            author: "alice".to_string(),
            content: "hi".to_string(),
            created_at: String::new(),
        };

        let out = msg.canonicalize("general");
        assert_eq!(out.kind, MESSAGE_TYPE);
        assert_eq!(out.channel_id, "general");
        assert_eq!(out.author, "alice");
        assert_eq!(out.content, "hi");
        assert!(!out.created_at.is_empty());
    }

    #[test]
    fn test_canonicalize_keeps_client_timestamp() {
        let msg = WireMessage {
            kind: String::new(),
            channel_id: String::new(),
            author: "bob".to_string(),
            content: "x".to_string(),
            created_at: "2024-05-01T12:00:00Z".to_string(),
        };

        let out = msg.canonicalize("general");
        assert_eq!(out.created_at, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_wire_field_names() {
        let msg = WireMessage {
            kind: MESSAGE_TYPE.to_string(),
            channel_id: "general".to_string(),
            author: "alice".to_string(),
            content: "hi".to_string(),
            created_at: "2024-05-01T12:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["channel_id"], "general");
        assert_eq!(json["author"], "alice");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["created_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_missing_and_unknown_fields_tolerated() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"content":"hi","extra_field":42}"#).unwrap();
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.author, "");
        assert_eq!(msg.channel_id, "");
        assert_eq!(msg.created_at, "");
    }
}
