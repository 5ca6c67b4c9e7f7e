use crate::adapters::Store;
use crate::config::NotificationConfig;
use crate::domain::events::DomainEvent;
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::user::UserId;
use crate::error::{AppError, Result};
use crate::services::event_bus::EventBus;
use crate::services::require_admin;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    created_total: Counter<u64>,
    read_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            created_total: meter
                .u64_counter("relay_notifications_created_total")
                .with_description("Notifications stored, by type")
                .build(),
            read_total: meter
                .u64_counter("relay_notifications_read_total")
                .with_description("Notifications flipped to read")
                .build(),
        }
    }
}

/// Per-user notification feed. Every mutation is scoped to the owner: touching someone
/// else's notification looks exactly like touching one that does not exist.
#[derive(Clone, Debug)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    events: EventBus,
    default_limit: i64,
    max_limit: i64,
    metrics: Metrics,
}

impl NotificationService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus, config: &NotificationConfig) -> Self {
        Self {
            store,
            events,
            default_limit: config.default_list_limit,
            max_limit: config.max_list_limit,
            metrics: Metrics::new(),
        }
    }

    /// Newest first. `limit` is clamped to the configured maximum.
    ///
    /// # Errors
    /// Returns `AppError::Database` on store failure.
    pub async fn list(&self, user_id: UserId, unread_only: bool, limit: Option<i64>) -> Result<Vec<Notification>> {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit);
        self.store.list_notifications(user_id, unread_only, limit).await
    }

    /// # Errors
    /// Returns `AppError::Database` on store failure.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64> {
        self.store.count_unread_notifications(user_id).await
    }

    /// Marks one notification read. Already-read notifications succeed without change.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the notification is not the user's.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn mark_read(&self, notification_id: NotificationId, user_id: UserId) -> Result<()> {
        let changed = self.store.mark_notification_read(notification_id, user_id).await?.ok_or(AppError::NotFound)?;
        if changed {
            self.metrics.read_total.add(1, &[]);
            self.events.publish(DomainEvent::NotificationsChanged { user_id });
        }
        Ok(())
    }

    /// Returns how many notifications flipped; zero on a repeat call.
    ///
    /// # Errors
    /// Returns `AppError::Database` on store failure.
    #[tracing::instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let flipped = self.store.mark_all_notifications_read(user_id).await?;
        self.metrics.read_total.add(flipped, &[]);
        // Other tabs may hold stale counts even when nothing flipped here.
        self.events.publish(DomainEvent::NotificationsChanged { user_id });
        Ok(flipped)
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the notification is not the user's.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete(&self, notification_id: NotificationId, user_id: UserId) -> Result<()> {
        if !self.store.delete_notification(notification_id, user_id).await? {
            return Err(AppError::NotFound);
        }
        self.events.publish(DomainEvent::NotificationsChanged { user_id });
        Ok(())
    }

    /// Stores a notification on behalf of an admin actor.
    ///
    /// # Errors
    /// - `Forbidden` unless the actor is an active admin.
    /// - `BadRequest` if the payload is invalid.
    /// - `InvalidTarget` if the recipient does not exist.
    #[tracing::instrument(skip(self, notification), fields(recipient = notification.user_id), err(level = "debug"))]
    pub async fn create(&self, actor_id: UserId, notification: NewNotification) -> Result<Notification> {
        require_admin(self.store.as_ref(), actor_id).await?;
        self.deliver(notification).await
    }

    /// Stores a notification for another subsystem. Callers are trusted.
    ///
    /// # Errors
    /// - `BadRequest` if the payload is invalid.
    /// - `InvalidTarget` if the recipient does not exist.
    pub async fn deliver(&self, notification: NewNotification) -> Result<Notification> {
        notification.validate().map_err(AppError::BadRequest)?;
        if self.store.find_user(notification.user_id).await?.is_none() {
            return Err(AppError::InvalidTarget);
        }

        let created = self.store.insert_notification(notification).await?;
        self.metrics.created_total.add(1, &[KeyValue::new("type", created.kind.as_str())]);
        self.events.publish(DomainEvent::NotificationCreated { user_id: created.user_id });
        Ok(created)
    }
}
