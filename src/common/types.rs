use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Định danh người dùng trên server.
pub type UserId = u32;

/// Định danh cuộc hội thoại: id của người còn lại, tính từ phía người dùng cục bộ.
pub type ContactId = UserId;

/// Domain model đại diện một tin nhắn chat.
///
/// Field names follow the server's JSON (`senderId`, `recipientId`, `sentAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub sent_at: DateTime<Utc>,
    pub content: String,
}

impl Message {
    /// The conversation this message belongs to, seen from `local_user`.
    pub fn counterpart(&self, local_user: UserId) -> ContactId {
        if self.sender_id == local_user {
            self.recipient_id
        } else {
            self.sender_id
        }
    }
}

/// Server acknowledgement of an outbound send, carrying the sender id the
/// server actually recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageAck {
    pub recipient_id: UserId,
    pub sent_at: DateTime<Utc>,
    pub sender_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(sender_id: UserId, recipient_id: UserId) -> Message {
        Message {
            sender_id,
            recipient_id,
            sent_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            content: "hi".to_string(),
        }
    }

    #[test]
    fn counterpart_is_the_other_participant() {
        assert_eq!(message(7, 42).counterpart(7), 42);
        assert_eq!(message(42, 7).counterpart(7), 42);
    }

    #[test]
    fn history_json_uses_camel_case_keys() {
        let raw = r#"{"senderId":42,"recipientId":7,"sentAt":"2023-11-14T22:13:20Z","content":"hello"}"#;
        let parsed: Message = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.sender_id, 42);
        assert_eq!(parsed.recipient_id, 7);
        assert_eq!(parsed.sent_at.timestamp(), 1_700_000_000);
        assert_eq!(parsed.content, "hello");
    }
}
