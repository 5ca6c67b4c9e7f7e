use crate::domain::events::DomainEvent;
use opentelemetry::{KeyValue, global, metrics::Counter};
use tokio::sync::broadcast;

#[derive(Clone, Debug)]
struct Metrics {
    published_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            published_total: meter
                .u64_counter("relay_domain_events_published_total")
                .with_description("Domain events published by services")
                .build(),
        }
    }
}

/// In-process fan-out of domain events. Publishing never fails the caller: with no
/// subscriber (push disabled) events are simply discarded.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
    metrics: Metrics,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx, metrics: Metrics::new() }
    }

    pub fn publish(&self, event: DomainEvent) {
        let delivered = self.tx.send(event).is_ok();
        self.metrics
            .published_total
            .add(1, &[KeyValue::new("event", event.label()), KeyValue::new("routed", delivered)]);
        if !delivered {
            tracing::trace!(event = event.label(), "No event subscribers");
        }
    }

    /// Live receivers. With push enabled this is the broadcast worker.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}
