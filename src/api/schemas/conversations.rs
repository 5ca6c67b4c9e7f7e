use crate::api::schemas::messages::MessageResponse;
use crate::domain::conversation::{Conversation, ConversationSummary};
use crate::services::conversation_service::StartedConversation;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub other_user_id: i64,
    pub initial_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: i64,
    pub participants: [i64; 2],
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            participants: c.participants.as_array(),
            created_at: c.created_at,
            last_message_at: c.last_message_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub conversation: ConversationResponse,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<MessageResponse>,
}

impl From<StartedConversation> for StartConversationResponse {
    fn from(started: StartedConversation) -> Self {
        Self {
            conversation: started.conversation.into(),
            created: started.created,
            message: started.message.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryResponse {
    pub id: i64,
    pub other_user_id: i64,
    pub other_display_name: String,
    pub other_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
    pub last_message_preview: Option<String>,
    pub unread_count: i64,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(s: ConversationSummary) -> Self {
        Self {
            id: s.id,
            other_user_id: s.other_user_id,
            other_display_name: s.other_display_name,
            other_deleted: s.other_deleted,
            last_message_at: s.last_message_at,
            last_message_preview: s.last_message_preview,
            unread_count: s.unread_count,
        }
    }
}
