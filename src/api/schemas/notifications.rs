use crate::domain::notification::{NewNotification, Notification, NotificationType, Priority};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[serde(alias = "user_id")]
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    pub title: String,
    pub message: String,
    #[serde(alias = "action_url")]
    pub action_url: Option<String>,
}

impl From<CreateNotificationRequest> for NewNotification {
    fn from(req: CreateNotificationRequest) -> Self {
        Self {
            user_id: req.user_id,
            kind: req.kind,
            priority: req.priority,
            title: req.title,
            message: req.message,
            action_url: req.action_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            kind: n.kind,
            priority: n.priority,
            title: n.title,
            message: n.message,
            action_url: n.action_url,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
