use crate::adapters::database::records::MessageRecord;
use crate::domain::conversation::ConversationId;
use crate::domain::message::{Message, MessageId};
use crate::domain::user::UserId;
use crate::error::{AppError, Result};
use sqlx::PgConnection;

#[derive(Clone, Debug, Default)]
pub struct MessageRepository {}

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records a new message. A `None` sender stores a system message.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation or sender does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, content))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
        sender_id: Option<UserId>,
        content: &str,
    ) -> Result<Message> {
        let result = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content, is_system_message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, sender_id, content, is_read, is_system_message, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(sender_id.is_none())
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, message_id: MessageId) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, sender_id, content, is_read, is_system_message, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_conversation(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, sender_id, content, is_read, is_system_message, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Marks messages addressed to `reader` as read. Setting the flag is idempotent, so
    /// concurrent callers converge on the same state.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn mark_read(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1
              AND is_read = FALSE
              AND sender_id IS NOT NULL
              AND sender_id <> $2
            "#,
        )
        .bind(conversation_id)
        .bind(reader)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Returns the conversation the message belonged to, or `None` if it was already gone.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn delete(
        &self,
        conn: &mut PgConnection,
        message_id: MessageId,
    ) -> Result<Option<ConversationId>> {
        let conversation_id =
            sqlx::query_scalar::<_, ConversationId>("DELETE FROM messages WHERE id = $1 RETURNING conversation_id")
                .bind(message_id)
                .fetch_optional(conn)
                .await?;
        Ok(conversation_id)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn count_unread(&self, conn: &mut PgConnection, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE (c.user_low = $1 OR c.user_high = $1)
              AND m.is_read = FALSE
              AND m.sender_id IS NOT NULL
              AND m.sender_id <> $1
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }
}
