use crate::domain::conversation::{Conversation, ConversationSummary, ParticipantPair};
use crate::domain::message::preview_of;
use crate::error::AppError;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct ConversationRecord {
    pub(crate) id: i64,
    pub(crate) user_low: i64,
    pub(crate) user_high: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) last_message_at: OffsetDateTime,
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = AppError;

    fn try_from(record: ConversationRecord) -> Result<Self, Self::Error> {
        let participants = ParticipantPair::new(record.user_low, record.user_high)
            .ok_or_else(|| AppError::InternalMsg(format!("conversation {} has identical participants", record.id)))?;
        Ok(Self { id: record.id, participants, created_at: record.created_at, last_message_at: record.last_message_at })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ConversationSummaryRecord {
    pub(crate) id: i64,
    pub(crate) other_user_id: i64,
    pub(crate) other_display_name: String,
    pub(crate) other_deleted: bool,
    pub(crate) last_message_at: OffsetDateTime,
    pub(crate) last_message_content: Option<String>,
    pub(crate) unread_count: i64,
}

impl ConversationSummaryRecord {
    pub(crate) fn into_summary(self, preview_length: usize) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            other_user_id: self.other_user_id,
            other_display_name: self.other_display_name,
            other_deleted: self.other_deleted,
            last_message_at: self.last_message_at,
            last_message_preview: self.last_message_content.map(|content| preview_of(&content, preview_length)),
            unread_count: self.unread_count,
        }
    }
}
