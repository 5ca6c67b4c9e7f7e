use crate::domain::message::Message;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(alias = "conversation_id")]
    pub conversation_id: i64,
    #[serde(alias = "sender_id")]
    pub sender_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SystemMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    pub content: String,
    pub is_read: bool,
    pub is_system_message: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            content: m.content,
            is_read: m.is_read,
            is_system_message: m.is_system_message,
            created_at: m.created_at,
        }
    }
}
