pub mod badge_service;
pub mod broadcast_hub;
pub mod connection_registry;
pub mod conversation_service;
pub mod event_bus;
pub mod gateway;
pub mod health_service;
pub mod notification_service;

use crate::adapters::Store;
use crate::domain::user::{Role, UserId};
use crate::error::{AppError, Result};

/// Admin-only operations go through here. Soft-deleted admins lose the privilege.
pub(crate) async fn require_admin(store: &dyn Store, actor_id: UserId) -> Result<()> {
    match store.find_user(actor_id).await? {
        Some(user) if user.role == Role::Admin && !user.is_deleted() => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}
