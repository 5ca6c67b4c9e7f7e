use crate::adapters::Store;
use crate::domain::badge::{ActivityQuery, BadgeCounts, Category};
use crate::domain::events::DomainEvent;
use crate::domain::user::{Role, UserId};
use crate::error::{AppError, Result};
use crate::services::event_bus::EventBus;
use futures::future::try_join_all;
use std::sync::Arc;
use time::OffsetDateTime;

/// Derives per-category badge counts from the store. Nothing here is cached: every call
/// reflects the latest committed state.
#[derive(Clone, Debug)]
pub struct BadgeService {
    store: Arc<dyn Store>,
    events: EventBus,
}

impl BadgeService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Counts every category the role exposes.
    ///
    /// # Errors
    /// Returns `AppError::Database` if any underlying count fails.
    #[tracing::instrument(skip(self))]
    pub async fn get_category_counts(&self, user_id: UserId, role: Role) -> Result<BadgeCounts> {
        let counts = try_join_all(Category::for_role(role).iter().map(|category| async move {
            let count = self.count_category(user_id, role, *category).await?;
            Ok::<_, AppError>((*category, count))
        }))
        .await?;

        let mut badges = BadgeCounts::new();
        for (category, count) in counts {
            badges.set(category, count);
        }
        Ok(badges)
    }

    /// Resolves the user's role first. Used where only an id is at hand.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn counts_for_user(&self, user_id: UserId) -> Result<BadgeCounts> {
        let user = self.store.find_user(user_id).await?.ok_or(AppError::NotFound)?;
        self.get_category_counts(user_id, user.role).await
    }

    /// Records that the user opened a view-tracked tab. Last write wins. Pass `None` to
    /// stamp the marker with the store's clock, so it compares cleanly against activity rows.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for categories that clear by reading items instead.
    #[tracing::instrument(skip(self))]
    pub async fn mark_category_viewed(
        &self,
        user_id: UserId,
        category: Category,
        viewed_at: Option<OffsetDateTime>,
    ) -> Result<OffsetDateTime> {
        if !category.is_view_tracked() {
            return Err(AppError::BadRequest(format!("{category} cannot be marked as viewed")));
        }

        let stored = self.store.set_category_marker(user_id, category, viewed_at).await?;
        self.events.publish(DomainEvent::CategoryViewed { user_id });
        Ok(stored)
    }

    async fn count_category(&self, user_id: UserId, role: Role, category: Category) -> Result<i64> {
        match category {
            Category::Messages => self.store.count_unread_messages(user_id).await,
            Category::Notifications => self.store.count_unread_notifications(user_id).await,
            other => {
                let Some(query) = ActivityQuery::for_category(role, other) else {
                    return Ok(0);
                };
                let since = self.store.category_marker(user_id, other).await?;
                self.store.count_activity(user_id, query, since).await
            }
        }
    }
}
