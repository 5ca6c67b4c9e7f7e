//! JSON frames exchanged over the push channel.

use crate::domain::badge::BadgeCounts;
use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Authenticate {
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

impl ClientFrame {
    /// Decodes a text frame. Unknown `type` values and missing fields are errors.
    ///
    /// # Errors
    /// Returns the JSON error if the frame is not a known client frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frames the server pushes. Everything except badge counts is a bare invalidation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage,
    NewNotification,
    BadgeCountsUpdate { counts: BadgeCounts },
}

impl ServerEvent {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::NewNotification => "new_notification",
            Self::BadgeCountsUpdate { .. } => "badge_counts_update",
        }
    }

    /// # Errors
    /// Returns the JSON error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::badge::Category;
    use serde_json::json;

    #[test]
    fn test_decode_authenticate() {
        let frame = ClientFrame::decode(r#"{"type":"authenticate","userId":42}"#).unwrap();
        assert_eq!(frame, ClientFrame::Authenticate { user_id: 42 });
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(ClientFrame::decode(r#"{"type":"subscribe","userId":42}"#).is_err());
        assert!(ClientFrame::decode(r#"{"userId":42}"#).is_err());
        assert!(ClientFrame::decode(r#"{"type":"authenticate","userId":"42"}"#).is_err());
    }

    #[test]
    fn test_signal_frames_have_no_body() {
        assert_eq!(ServerEvent::NewMessage.encode().unwrap(), r#"{"type":"new_message"}"#);
        assert_eq!(ServerEvent::NewNotification.encode().unwrap(), r#"{"type":"new_notification"}"#);
    }

    #[test]
    fn test_badge_frame_carries_counts() {
        let mut counts = BadgeCounts::new();
        counts.set(Category::Messages, 3);
        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::BadgeCountsUpdate { counts }.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "badge_counts_update", "counts": {"messages": 3}}));
    }
}
