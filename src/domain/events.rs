use crate::domain::conversation::ConversationId;
use crate::domain::user::UserId;

/// Something changed in the store that connected clients may want to refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    MessageCreated { conversation_id: ConversationId, participants: [UserId; 2] },
    MessageDeleted { conversation_id: ConversationId, participants: [UserId; 2] },
    ReadStateChanged { user_id: UserId },
    NotificationCreated { user_id: UserId },
    NotificationsChanged { user_id: UserId },
    CategoryViewed { user_id: UserId },
}

impl DomainEvent {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MessageCreated { .. } => "message_created",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::ReadStateChanged { .. } => "read_state_changed",
            Self::NotificationCreated { .. } => "notification_created",
            Self::NotificationsChanged { .. } => "notifications_changed",
            Self::CategoryViewed { .. } => "category_viewed",
        }
    }
}
