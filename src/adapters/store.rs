use crate::domain::badge::{ActivityQuery, Category};
use crate::domain::conversation::{Conversation, ConversationCreation, ConversationId, ConversationSummary, ParticipantPair};
use crate::domain::message::{Message, MessageId};
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::user::{User, UserId};
use crate::error::Result;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Message to append to a conversation.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: Option<UserId>,
    pub content: String,
}

/// The persistence boundary. The store is the single source of truth; everything the
/// push path carries can be re-derived from it.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> Result<()>;

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>>;

    async fn find_conversation(&self, conversation_id: ConversationId) -> Result<Option<Conversation>>;

    /// Inserts the conversation and its first message atomically. If the pair already has
    /// a conversation, nothing is written and the existing row is returned.
    async fn create_conversation(
        &self,
        pair: ParticipantPair,
        sender_id: UserId,
        content: String,
    ) -> Result<ConversationCreation>;

    /// Newest activity first.
    async fn list_conversations(&self, user_id: UserId, preview_length: usize) -> Result<Vec<ConversationSummary>>;

    /// Appends a message and advances the conversation's `last_message_at`.
    async fn insert_message(&self, message: NewMessage) -> Result<Message>;

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>>;

    /// Ordered by `(created_at, id)` ascending.
    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>>;

    /// Flips `is_read` on unread messages in the conversation not sent by `reader`.
    /// System messages are skipped. Returns the number of rows changed.
    async fn mark_messages_read(&self, conversation_id: ConversationId, reader: UserId) -> Result<u64>;

    /// Removes the message and pulls the conversation's `last_message_at` back to the newest
    /// remaining message (or its creation time when none remain).
    async fn delete_message(&self, message_id: MessageId) -> Result<bool>;

    async fn count_unread_messages(&self, user_id: UserId) -> Result<i64>;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification>;

    /// Newest first.
    async fn list_notifications(&self, user_id: UserId, unread_only: bool, limit: i64) -> Result<Vec<Notification>>;

    /// `None` when the notification does not exist or belongs to someone else;
    /// otherwise whether this call flipped it.
    async fn mark_notification_read(&self, notification_id: NotificationId, user_id: UserId) -> Result<Option<bool>>;

    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64>;

    async fn delete_notification(&self, notification_id: NotificationId, user_id: UserId) -> Result<bool>;

    async fn count_unread_notifications(&self, user_id: UserId) -> Result<i64>;

    async fn category_marker(&self, user_id: UserId, category: Category) -> Result<Option<OffsetDateTime>>;

    /// Last write wins. `None` stamps the marker with the store's own clock, the same clock
    /// that stamps activity rows. Returns the stored time.
    async fn set_category_marker(
        &self,
        user_id: UserId,
        category: Category,
        viewed_at: Option<OffsetDateTime>,
    ) -> Result<OffsetDateTime>;

    /// Counts rows matching `query` that changed strictly after `since` (all rows when `None`).
    async fn count_activity(&self, user_id: UserId, query: ActivityQuery, since: Option<OffsetDateTime>) -> Result<i64>;
}
