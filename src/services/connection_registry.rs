use crate::domain::push::ServerEvent;
use crate::domain::user::UserId;
use dashmap::DashMap;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, UpDownCounter},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

pub type ChannelId = Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    deliveries_total: Counter<u64>,
    active_channels: UpDownCounter<i64>,
    gc_duration_seconds: Histogram<f64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            deliveries_total: meter
                .u64_counter("relay_push_deliveries_total")
                .with_description("Push frame delivery attempts by outcome")
                .build(),
            active_channels: meter
                .i64_up_down_counter("relay_push_channels")
                .with_description("Number of registered push channels")
                .build(),
            gc_duration_seconds: meter
                .f64_histogram("relay_push_gc_duration_seconds")
                .with_description("Time taken to perform a single GC iteration")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("relay_push_channels_reclaimed_total")
                .with_description("Total number of closed channels reclaimed by GC")
                .build(),
        }
    }
}

/// One live client connection's outbound lane. The session owns the receiving half.
#[derive(Debug)]
pub struct PushChannel {
    id: ChannelId,
    tx: mpsc::Sender<ServerEvent>,
}

impl PushChannel {
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { id: Uuid::now_v7(), tx }, rx)
    }

    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }
}

/// Maps each user to their currently open push channels. A user may hold several at once
/// (multiple tabs or devices); every one of them receives every event for that user.
#[derive(Clone, Debug)]
pub struct ConnectionRegistry {
    channels: Arc<DashMap<UserId, HashMap<ChannelId, mpsc::Sender<ServerEvent>>>>,
    owners: Arc<DashMap<ChannelId, UserId>>,
    metrics: Metrics,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { channels: Arc::new(DashMap::new()), owners: Arc::new(DashMap::new()), metrics: Metrics::new() }
    }

    #[tracing::instrument(skip(self, channel), fields(channel_id = %channel.id))]
    pub fn register(&self, user_id: UserId, channel: PushChannel) {
        self.owners.insert(channel.id, user_id);
        self.channels.entry(user_id).or_default().insert(channel.id, channel.tx);
        self.metrics.active_channels.add(1, &[]);
        tracing::debug!("Push channel registered");
    }

    /// Removes a channel. Returns the owning user, or `None` if it was already gone, so
    /// calling this twice for the same channel is harmless.
    pub fn unregister(&self, channel_id: ChannelId) -> Option<UserId> {
        let (_, user_id) = self.owners.remove(&channel_id)?;

        if let Some(mut set) = self.channels.get_mut(&user_id) {
            set.remove(&channel_id);
        }
        self.channels.remove_if(&user_id, |_, set| set.is_empty());

        self.metrics.active_channels.add(-1, &[]);
        tracing::debug!(%channel_id, user_id, "Push channel unregistered");
        Some(user_id)
    }

    /// Queues `event` on every channel the user has open and returns how many accepted it.
    /// Never blocks: a full buffer drops the frame for that channel only, and a closed one
    /// is unregistered.
    pub fn send_to(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        if let Some(set) = self.channels.get(&user_id) {
            for (channel_id, tx) in set.iter() {
                let status = match tx.try_send(event.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        "delivered"
                    }
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(%channel_id, user_id, event = event.label(), "Push channel full, dropping frame");
                        "dropped"
                    }
                    Err(TrySendError::Closed(_)) => {
                        closed.push(*channel_id);
                        "closed"
                    }
                };
                self.metrics
                    .deliveries_total
                    .add(1, &[KeyValue::new("event", event.label()), KeyValue::new("status", status)]);
            }
        }

        for channel_id in closed {
            self.unregister(channel_id);
        }

        delivered
    }

    #[must_use]
    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.channels.get(&user_id).map_or(0, |set| set.len())
    }

    #[must_use]
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connection_count(user_id) > 0
    }

    /// Reclaims channels whose session went away without unregistering.
    pub fn perform_gc(&self) {
        let start = std::time::Instant::now();
        tracing::debug!("Starting push channel GC cycle");

        let stale: Vec<ChannelId> = self
            .channels
            .iter()
            .flat_map(|entry| {
                entry.value().iter().filter(|(_, tx)| tx.is_closed()).map(|(id, _)| *id).collect::<Vec<_>>()
            })
            .collect();

        let mut reclaimed: u64 = 0;
        for channel_id in stale {
            if self.unregister(channel_id).is_some() {
                reclaimed += 1;
            }
        }

        let duration = start.elapsed().as_secs_f64();
        self.metrics.gc_duration_seconds.record(duration, &[]);

        if reclaimed > 0 {
            self.metrics.gc_reclaimed_total.add(reclaimed, &[]);
            tracing::info!(reclaimed, "Push channel GC reclaimed closed channels");
        }
        tracing::debug!(duration_secs = %duration, "Push channel GC cycle completed");
    }
}
