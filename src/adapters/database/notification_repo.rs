use crate::adapters::database::records::NotificationRecord;
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::user::UserId;
use crate::error::{AppError, Result};
use sqlx::PgConnection;

const COLUMNS: &str = "id, user_id, kind, priority, title, message, action_url, is_read, created_at";

#[derive(Clone, Debug, Default)]
pub struct NotificationRepository {}

impl NotificationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// # Errors
    /// Returns `AppError::InvalidTarget` if the owner does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, notification), fields(user_id = notification.user_id))]
    pub(crate) async fn create(&self, conn: &mut PgConnection, notification: NewNotification) -> Result<Notification> {
        let result = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            INSERT INTO notifications (user_id, kind, priority, title, message, action_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(notification.priority.as_str())
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.action_url)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => record.try_into(),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::InvalidTarget),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM notifications
            WHERE user_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        records.into_iter().map(Notification::try_from).collect()
    }

    /// Returns `None` if the notification is not owned by `user_id`, otherwise whether
    /// the flag changed.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn mark_read(
        &self,
        conn: &mut PgConnection,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> Result<Option<bool>> {
        let updated = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(Some(true));
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM notifications WHERE id = $1 AND user_id = $2)")
                .bind(notification_id)
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists.then_some(false))
    }

    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn mark_all_read(&self, conn: &mut PgConnection, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn delete(
        &self,
        conn: &mut PgConnection,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn count_unread(&self, conn: &mut PgConnection, user_id: UserId) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
                .bind(user_id)
                .fetch_one(conn)
                .await?;
        Ok(count)
    }
}
