use crate::domain::events::DomainEvent;
use crate::services::broadcast_hub::BroadcastHub;
use crate::services::connection_registry::ConnectionRegistry;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;

/// Drains the event bus into the hub and periodically sweeps closed push channels.
#[derive(Debug)]
pub struct BroadcastWorker {
    hub: BroadcastHub,
    registry: ConnectionRegistry,
    events: broadcast::Receiver<DomainEvent>,
    gc_interval_secs: u64,
}

impl BroadcastWorker {
    /// Takes an already-subscribed receiver so events published during startup are kept.
    #[must_use]
    pub const fn new(
        hub: BroadcastHub,
        registry: ConnectionRegistry,
        events: broadcast::Receiver<DomainEvent>,
        gc_interval_secs: u64,
    ) -> Self {
        Self { hub, registry, events, gc_interval_secs }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut gc_interval = tokio::time::interval(Duration::from_secs(self.gc_interval_secs.max(1)));

        tracing::info!("Broadcast worker started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                _ = gc_interval.tick() => {
                    async {
                        self.registry.perform_gc();
                    }
                    .instrument(tracing::debug_span!("push_channel_gc_iteration"))
                    .await;
                }

                result = self.events.recv() => {
                    match result {
                        Ok(event) => self.hub.handle_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(missed = n, "Broadcast worker lagged, clients will resync on next poll");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::error!("Event bus closed, worker exiting");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Broadcast worker shutting down...");
    }
}
