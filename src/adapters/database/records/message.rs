use crate::domain::message::Message;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: i64,
    pub(crate) conversation_id: i64,
    pub(crate) sender_id: Option<i64>,
    pub(crate) content: String,
    pub(crate) is_read: bool,
    pub(crate) is_system_message: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            content: record.content,
            is_read: record.is_read,
            is_system_message: record.is_system_message,
            created_at: record.created_at,
        }
    }
}
