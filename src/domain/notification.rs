use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

pub type NotificationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewMessage,
    ApplicationUpdate,
    JobUpdate,
    ProfileView,
    Feedback,
    ContactMessage,
    System,
}

impl NotificationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::ApplicationUpdate => "application_update",
            Self::JobUpdate => "job_update",
            Self::ProfileView => "profile_view",
            Self::Feedback => "feedback",
            Self::ContactMessage => "contact_message",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_message" => Ok(Self::NewMessage),
            "application_update" => Ok(Self::ApplicationUpdate),
            "job_update" => Ok(Self::JobUpdate),
            "profile_view" => Ok(Self::ProfileView),
            "feedback" => Ok(Self::Feedback),
            "contact_message" => Ok(Self::ContactMessage),
            "system" => Ok(Self::System),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
}

impl NewNotification {
    /// Checks the fields a producer controls.
    ///
    /// # Errors
    /// Returns a human readable reason for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Notification title must not be empty".to_string());
        }
        if let Some(url) = &self.action_url
            && !is_valid_action_url(url)
        {
            return Err(format!("Invalid action URL: {url}"));
        }
        Ok(())
    }
}

/// Accepts internal paths (`/jobs/42`) and absolute http(s) URLs.
#[must_use]
pub fn is_valid_action_url(url: &str) -> bool {
    if url.chars().any(char::is_whitespace) {
        return false;
    }
    if let Some(rest) = url.strip_prefix('/') {
        // Protocol-relative URLs would leave the site.
        return !rest.starts_with('/');
    }
    ["https://", "http://"].iter().any(|scheme| url.strip_prefix(scheme).is_some_and(|host| !host.is_empty()))
}
