use crate::domain::notification::Notification;
use crate::error::AppError;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRecord {
    pub(crate) id: i64,
    pub(crate) user_id: i64,
    pub(crate) kind: String,
    pub(crate) priority: String,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) action_url: Option<String>,
    pub(crate) is_read: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = AppError;

    fn try_from(record: NotificationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            kind: record.kind.parse().map_err(AppError::InternalMsg)?,
            priority: record.priority.parse().map_err(AppError::InternalMsg)?,
            title: record.title,
            message: record.message,
            action_url: record.action_url,
            is_read: record.is_read,
            created_at: record.created_at,
        })
    }
}
