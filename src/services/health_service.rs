use crate::adapters::Store;
use crate::services::event_bus::EventBus;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
struct Metrics {
    status: Gauge<i64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            status: meter
                .i64_gauge("relay_component_ready")
                .with_description("Readiness per component (1 ready, 0 not ready)")
                .build(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Error,
    /// Not configured to run, which does not block readiness.
    Disabled,
}

impl ComponentStatus {
    const fn is_ready(self) -> bool {
        !matches!(self, Self::Error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Readiness {
    pub database: ComponentStatus,
    pub push: ComponentStatus,
}

impl Readiness {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.database.is_ready() && self.push.is_ready()
    }
}

/// Answers the management readiness check. The relay is ready when its store answers a
/// ping in time and, with push enabled, the broadcast worker is still draining the bus.
#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<dyn Store>,
    events: EventBus,
    push_enabled: bool,
    db_timeout: Duration,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus, push_enabled: bool, db_timeout_ms: u64) -> Self {
        Self { store, events, push_enabled, db_timeout: Duration::from_millis(db_timeout_ms), metrics: Metrics::new() }
    }

    pub async fn readiness(&self) -> Readiness {
        let readiness = Readiness { database: self.check_store().await, push: self.check_push() };
        self.record("database", readiness.database);
        self.record("push", readiness.push);
        readiness
    }

    async fn check_store(&self) -> ComponentStatus {
        match timeout(self.db_timeout, self.store.ping()).await {
            Ok(Ok(())) => ComponentStatus::Ok,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, component = "database", "Store ping failed");
                ComponentStatus::Error
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.db_timeout.as_millis(), component = "database", "Store ping timed out");
                ComponentStatus::Error
            }
        }
    }

    fn check_push(&self) -> ComponentStatus {
        if !self.push_enabled {
            return ComponentStatus::Disabled;
        }
        if self.events.subscriber_count() > 0 {
            ComponentStatus::Ok
        } else {
            tracing::warn!(component = "push", "Broadcast worker is not subscribed to the event bus");
            ComponentStatus::Error
        }
    }

    fn record(&self, component: &'static str, status: ComponentStatus) {
        if status != ComponentStatus::Disabled {
            self.metrics.status.record(i64::from(status.is_ready()), &[KeyValue::new("component", component)]);
        }
    }
}
