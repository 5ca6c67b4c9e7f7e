use crate::adapters::database::records::{ConversationRecord, ConversationSummaryRecord};
use crate::domain::conversation::{Conversation, ConversationId, ConversationSummary, ParticipantPair};
use crate::domain::user::UserId;
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository {}

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, user_low, user_high, created_at, last_message_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(conn)
        .await?;

        record.map(Conversation::try_from).transpose()
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_pair(
        &self,
        conn: &mut PgConnection,
        pair: ParticipantPair,
    ) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, user_low, user_high, created_at, last_message_at
            FROM conversations
            WHERE user_low = $1 AND user_high = $2
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(conn)
        .await?;

        record.map(Conversation::try_from).transpose()
    }

    /// Inserts a conversation for the pair unless one exists. Returns `None` on conflict;
    /// the caller re-reads the winning row.
    ///
    /// # Errors
    /// Returns `AppError::InvalidTarget` if either participant does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn insert_if_absent(
        &self,
        conn: &mut PgConnection,
        pair: ParticipantPair,
    ) -> Result<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationRecord>(
            r#"
            INSERT INTO conversations (user_low, user_high)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT conversations_unique_pair DO NOTHING
            RETURNING id, user_low, user_high, created_at, last_message_at
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(conn)
        .await;

        match result {
            Ok(record) => record.map(Conversation::try_from).transpose(),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: a participant does not exist
                Err(AppError::InvalidTarget)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn touch_last_message_at(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
        at: OffsetDateTime,
    ) -> Result<()> {
        sqlx::query("UPDATE conversations SET last_message_at = GREATEST(last_message_at, $2) WHERE id = $1")
            .bind(conversation_id)
            .bind(at)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Recomputes `last_message_at` after a message was removed. Falls back to the
    /// conversation's creation time when it has no messages left.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn rewind_last_message_at(
        &self,
        conn: &mut PgConnection,
        conversation_id: ConversationId,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversations c
            SET last_message_at = COALESCE(
                (SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id = c.id),
                c.created_at
            )
            WHERE c.id = $1
            "#,
        )
        .bind(conversation_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Conversations of `user_id`, newest activity first, with counterpart details,
    /// the latest message and the caller's unread count.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_summaries(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        preview_length: usize,
    ) -> Result<Vec<ConversationSummary>> {
        let records = sqlx::query_as::<_, ConversationSummaryRecord>(
            r#"
            SELECT c.id,
                   other.id AS other_user_id,
                   COALESCE(u.display_name, 'Unknown user') AS other_display_name,
                   (u.id IS NULL OR u.deleted_at IS NOT NULL) AS other_deleted,
                   c.last_message_at,
                   last_msg.content AS last_message_content,
                   unread.count AS unread_count
            FROM conversations c
            CROSS JOIN LATERAL (
                SELECT CASE WHEN c.user_low = $1 THEN c.user_high ELSE c.user_low END AS id
            ) other
            LEFT JOIN users u ON u.id = other.id
            LEFT JOIN LATERAL (
                SELECT m.content
                FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT 1
            ) last_msg ON TRUE
            CROSS JOIN LATERAL (
                SELECT COUNT(*) AS count
                FROM messages m
                WHERE m.conversation_id = c.id
                  AND m.is_read = FALSE
                  AND m.sender_id IS NOT NULL
                  AND m.sender_id <> $1
            ) unread
            WHERE c.user_low = $1 OR c.user_high = $1
            ORDER BY c.last_message_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into_summary(preview_length)).collect())
    }
}
