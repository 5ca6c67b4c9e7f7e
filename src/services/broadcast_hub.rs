use crate::domain::events::DomainEvent;
use crate::domain::push::ServerEvent;
use crate::domain::user::UserId;
use crate::services::badge_service::BadgeService;
use crate::services::connection_registry::ConnectionRegistry;
use opentelemetry::{KeyValue, global, metrics::Counter};

#[derive(Clone, Debug)]
struct Metrics {
    events_total: Counter<u64>,
    count_failures_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            events_total: meter
                .u64_counter("relay_hub_events_total")
                .with_description("Domain events handled by the broadcast hub")
                .build(),
            count_failures_total: meter
                .u64_counter("relay_hub_count_failures_total")
                .with_description("Badge recomputations that failed during push")
                .build(),
        }
    }
}

/// Turns domain events into push frames for the users they affect. Everything here is
/// best effort; clients that miss a frame catch up on their next poll.
#[derive(Clone, Debug)]
pub struct BroadcastHub {
    registry: ConnectionRegistry,
    badges: BadgeService,
    metrics: Metrics,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(registry: ConnectionRegistry, badges: BadgeService) -> Self {
        Self { registry, badges, metrics: Metrics::new() }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(event = event.label()))]
    pub async fn handle_event(&self, event: DomainEvent) {
        self.metrics.events_total.add(1, &[KeyValue::new("event", event.label())]);

        match event {
            DomainEvent::MessageCreated { participants, .. } => {
                for user_id in participants {
                    self.registry.send_to(user_id, &ServerEvent::NewMessage);
                }
            }
            DomainEvent::MessageDeleted { participants, .. } => {
                for user_id in participants {
                    self.registry.send_to(user_id, &ServerEvent::NewMessage);
                }
                for user_id in participants {
                    self.push_counts(user_id).await;
                }
            }
            DomainEvent::NotificationCreated { user_id } => {
                self.registry.send_to(user_id, &ServerEvent::NewNotification);
                self.push_counts(user_id).await;
            }
            DomainEvent::ReadStateChanged { user_id }
            | DomainEvent::NotificationsChanged { user_id }
            | DomainEvent::CategoryViewed { user_id } => {
                self.push_counts(user_id).await;
            }
        }
    }

    async fn push_counts(&self, user_id: UserId) {
        if !self.registry.is_online(user_id) {
            return;
        }

        match self.badges.counts_for_user(user_id).await {
            Ok(counts) => {
                let delivered = self.registry.send_to(user_id, &ServerEvent::BadgeCountsUpdate { counts });
                tracing::trace!(user_id, delivered, "Pushed badge counts");
            }
            Err(e) => {
                self.metrics.count_failures_total.add(1, &[]);
                tracing::warn!(user_id, error = %e, "Failed to compute badge counts for push");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::badge::Category;
    use crate::domain::user::Role;
    use crate::services::connection_registry::PushChannel;
    use crate::services::event_bus::EventBus;
    use std::sync::Arc;

    async fn setup() -> (MemoryStore, ConnectionRegistry, BroadcastHub) {
        let store = MemoryStore::new();
        store.insert_user(1, "Finn", Role::Freelancer).await;
        store.insert_user(2, "Rita", Role::Recruiter).await;
        let registry = ConnectionRegistry::new();
        let badges = BadgeService::new(Arc::new(store.clone()), EventBus::new(4));
        let hub = BroadcastHub::new(registry.clone(), badges);
        (store, registry, hub)
    }

    #[tokio::test]
    async fn test_message_created_signals_both_participants() {
        let (_store, registry, hub) = setup().await;
        let (finn, mut finn_rx) = PushChannel::new(8);
        let (rita, mut rita_rx) = PushChannel::new(8);
        registry.register(1, finn);
        registry.register(2, rita);

        hub.handle_event(DomainEvent::MessageCreated { conversation_id: 10, participants: [1, 2] }).await;

        assert_eq!(finn_rx.try_recv().unwrap(), ServerEvent::NewMessage);
        assert_eq!(rita_rx.try_recv().unwrap(), ServerEvent::NewMessage);
        assert!(finn_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_state_pushes_counts_to_every_tab() {
        let (_store, registry, hub) = setup().await;
        let (first, mut first_rx) = PushChannel::new(8);
        let (second, mut second_rx) = PushChannel::new(8);
        registry.register(2, first);
        registry.register(2, second);

        hub.handle_event(DomainEvent::ReadStateChanged { user_id: 2 }).await;

        for rx in [&mut first_rx, &mut second_rx] {
            let ServerEvent::BadgeCountsUpdate { counts } = rx.try_recv().unwrap() else {
                panic!("expected badge counts");
            };
            assert_eq!(counts.get(Category::Messages), Some(0));
            assert_eq!(counts.get(Category::Ratings), None);
        }
    }

    #[tokio::test]
    async fn test_notification_created_signals_then_counts() {
        let (_store, registry, hub) = setup().await;
        let (channel, mut rx) = PushChannel::new(8);
        registry.register(1, channel);

        hub.handle_event(DomainEvent::NotificationCreated { user_id: 1 }).await;

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::NewNotification);
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::BadgeCountsUpdate { .. }));
    }

    #[tokio::test]
    async fn test_offline_users_are_skipped() {
        let (_store, registry, hub) = setup().await;
        hub.handle_event(DomainEvent::CategoryViewed { user_id: 1 }).await;
        hub.handle_event(DomainEvent::MessageDeleted { conversation_id: 1, participants: [1, 2] }).await;
        assert_eq!(registry.connection_count(1), 0);
    }

    #[tokio::test]
    async fn test_count_failure_does_not_panic() {
        let (_store, registry, hub) = setup().await;
        let (ghost, mut rx) = PushChannel::new(8);
        registry.register(404, ghost);

        hub.handle_event(DomainEvent::NotificationsChanged { user_id: 404 }).await;

        assert!(rx.try_recv().is_err());
    }
}
