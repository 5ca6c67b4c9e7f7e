pub mod activity_repo;
pub mod conversation_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod records;
pub mod user_repo;

use crate::adapters::store::{NewMessage, Store};
use crate::config::DatabaseConfig;
use crate::domain::badge::{ActivityQuery, Category};
use crate::domain::conversation::{
    Conversation, ConversationCreation, ConversationId, ConversationSummary, ParticipantPair,
};
use crate::domain::message::{Message, MessageId};
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::user::{User, UserId};
use crate::error::{AppError, Result};
use activity_repo::ActivityRepository;
use async_trait::async_trait;
use conversation_repo::ConversationRepository;
use message_repo::MessageRepository;
use notification_repo::NotificationRepository;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use time::OffsetDateTime;
use user_repo::UserRepository;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(url: &str, config: &DatabaseConfig) -> std::result::Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(url)
        .await
}

/// Postgres-backed [`Store`]. Pair uniqueness and read-flag monotonicity are enforced by
/// constraints and conditional updates, never by in-process locks.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: DbPool,
    users: UserRepository,
    conversations: ConversationRepository,
    messages: MessageRepository,
    notifications: NotificationRepository,
    activity: ActivityRepository,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(),
            conversations: ConversationRepository::new(),
            messages: MessageRepository::new(),
            notifications: NotificationRepository::new(),
            activity: ActivityRepository::new(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        self.users.find_by_id(&mut conn, user_id).await
    }

    async fn find_conversation(&self, conversation_id: ConversationId) -> Result<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.find_by_id(&mut conn, conversation_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, content))]
    async fn create_conversation(
        &self,
        pair: ParticipantPair,
        sender_id: UserId,
        content: String,
    ) -> Result<ConversationCreation> {
        let mut tx = self.pool.begin().await?;

        let Some(conversation) = self.conversations.insert_if_absent(&mut tx, pair).await? else {
            // Lost the race (or the pair already talked): the unique constraint kept one row.
            tx.rollback().await?;
            let mut conn = self.pool.acquire().await?;
            let existing = self.conversations.find_by_pair(&mut conn, pair).await?.ok_or_else(|| {
                AppError::InternalMsg("conversation conflict reported but no row found".to_string())
            })?;
            return Ok(ConversationCreation::Existing(existing));
        };

        let message = self.messages.create(&mut tx, conversation.id, Some(sender_id), &content).await?;
        self.conversations.touch_last_message_at(&mut tx, conversation.id, message.created_at).await?;
        tx.commit().await?;

        let conversation = Conversation { last_message_at: message.created_at, ..conversation };
        Ok(ConversationCreation::Created { conversation, message })
    }

    async fn list_conversations(&self, user_id: UserId, preview_length: usize) -> Result<Vec<ConversationSummary>> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.list_summaries(&mut conn, user_id, preview_length).await
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;
        let created =
            self.messages.create(&mut tx, message.conversation_id, message.sender_id, &message.content).await?;
        self.conversations.touch_last_message_at(&mut tx, message.conversation_id, created.created_at).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>> {
        let mut conn = self.pool.acquire().await?;
        self.messages.find_by_id(&mut conn, message_id).await
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let mut conn = self.pool.acquire().await?;
        self.messages.list_for_conversation(&mut conn, conversation_id).await
    }

    async fn mark_messages_read(&self, conversation_id: ConversationId, reader: UserId) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        self.messages.mark_read(&mut conn, conversation_id, reader).await
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let Some(conversation_id) = self.messages.delete(&mut tx, message_id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };
        self.conversations.rewind_last_message_at(&mut tx, conversation_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn count_unread_messages(&self, user_id: UserId) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.messages.count_unread(&mut conn, user_id).await
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.create(&mut conn, notification).await
    }

    async fn list_notifications(&self, user_id: UserId, unread_only: bool, limit: i64) -> Result<Vec<Notification>> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.list_for_user(&mut conn, user_id, unread_only, limit).await
    }

    async fn mark_notification_read(&self, notification_id: NotificationId, user_id: UserId) -> Result<Option<bool>> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.mark_read(&mut conn, notification_id, user_id).await
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.mark_all_read(&mut conn, user_id).await
    }

    async fn delete_notification(&self, notification_id: NotificationId, user_id: UserId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.delete(&mut conn, notification_id, user_id).await
    }

    async fn count_unread_notifications(&self, user_id: UserId) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.notifications.count_unread(&mut conn, user_id).await
    }

    async fn category_marker(&self, user_id: UserId, category: Category) -> Result<Option<OffsetDateTime>> {
        let mut conn = self.pool.acquire().await?;
        self.activity.find_marker(&mut conn, user_id, category).await
    }

    async fn set_category_marker(
        &self,
        user_id: UserId,
        category: Category,
        viewed_at: Option<OffsetDateTime>,
    ) -> Result<OffsetDateTime> {
        let mut conn = self.pool.acquire().await?;
        self.activity.upsert_marker(&mut conn, user_id, category, viewed_at).await
    }

    async fn count_activity(&self, user_id: UserId, query: ActivityQuery, since: Option<OffsetDateTime>) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.activity.count(&mut conn, user_id, query, since).await
    }
}
