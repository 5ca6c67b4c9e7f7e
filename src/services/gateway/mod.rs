pub(crate) mod session;

use crate::adapters::Store;
use crate::config::WsConfig;
use crate::domain::push::ClientFrame;
use crate::domain::user::UserId;
use crate::services::connection_registry::{ConnectionRegistry, PushChannel};
use crate::services::gateway::session::Session;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, close_code};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) active_connections: UpDownCounter<i64>,
    pub(crate) handshake_failures_total: Counter<u64>,
    pub(crate) frames_sent_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            active_connections: meter
                .i64_up_down_counter("websocket_active_connections")
                .with_description("Number of authenticated WebSocket connections")
                .build(),
            handshake_failures_total: meter
                .u64_counter("websocket_handshake_failures_total")
                .with_description("Sockets closed before authentication completed")
                .build(),
            frames_sent_total: meter
                .u64_counter("websocket_frames_sent_total")
                .with_description("Push frames written to sockets")
                .build(),
        }
    }
}

#[derive(Debug, Error)]
enum HandshakeError {
    #[error("missing or invalid token")]
    Unauthenticated,
    #[error("no authenticate frame before timeout")]
    Timeout,
    #[error("socket closed during handshake")]
    Closed,
    #[error("first frame must be an authenticate frame")]
    Malformed,
    #[error("authenticate frame does not match token")]
    IdentityMismatch,
    #[error("unknown or deactivated user")]
    UnknownUser,
    #[error("user lookup failed: {0}")]
    Lookup(String),
}

impl HandshakeError {
    const fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::Malformed => "malformed",
            Self::IdentityMismatch => "identity_mismatch",
            Self::UnknownUser => "unknown_user",
            Self::Lookup(_) => "lookup",
        }
    }

    const fn close_code(&self) -> Option<u16> {
        match self {
            Self::Closed => None,
            Self::Lookup(_) => Some(close_code::ERROR),
            Self::Unauthenticated
            | Self::Timeout
            | Self::Malformed
            | Self::IdentityMismatch
            | Self::UnknownUser => Some(close_code::POLICY),
        }
    }
}

/// Accepts push channels. A channel is registered only when its bearer token and its first
/// frame name the same live user; the socket then belongs to a [`Session`] until it closes.
#[derive(Clone, Debug)]
pub struct GatewayService {
    store: Arc<dyn Store>,
    registry: ConnectionRegistry,
    config: WsConfig,
    metrics: Metrics,
}

impl GatewayService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, registry: ConnectionRegistry, config: WsConfig) -> Self {
        Self { store, registry, config, metrics: Metrics::new() }
    }

    /// `owner` is the user id from the verified upgrade token, or `None` if it was missing or invalid.
    pub async fn handle_socket(
        &self,
        mut socket: WebSocket,
        owner: Option<UserId>,
        request_id: String,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let user_id = match self.authenticate(&mut socket, owner).await {
            Ok(user_id) => user_id,
            Err(e) => {
                self.metrics.handshake_failures_total.add(1, &[KeyValue::new("reason", e.label())]);
                tracing::warn!(%request_id, error = %e, "WebSocket handshake rejected");
                if let Some(code) = e.close_code() {
                    let _ = socket
                        .send(WsMessage::Close(Some(CloseFrame { code, reason: e.to_string().into() })))
                        .await;
                }
                return;
            }
        };

        let (channel, outbound_rx) = PushChannel::new(self.config.outbound_buffer_size);
        let session = Session {
            user_id,
            request_id,
            channel_id: channel.id(),
            socket,
            outbound_rx,
            registry: self.registry.clone(),
            metrics: self.metrics.clone(),
            shutdown_rx,
        };
        self.registry.register(user_id, channel);

        session.run().await;
    }

    async fn authenticate(&self, socket: &mut WebSocket, owner: Option<UserId>) -> Result<UserId, HandshakeError> {
        let owner = owner.ok_or(HandshakeError::Unauthenticated)?;
        let deadline = Duration::from_secs(self.config.auth_timeout_secs);

        let frame = timeout(deadline, async {
            loop {
                match socket.recv().await {
                    Some(Ok(WsMessage::Text(text))) => {
                        return ClientFrame::decode(text.as_str()).map_err(|_| HandshakeError::Malformed);
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Binary(_))) => return Err(HandshakeError::Malformed),
                    Some(Ok(WsMessage::Close(_)) | Err(_)) | None => return Err(HandshakeError::Closed),
                }
            }
        })
        .await
        .map_err(|_| HandshakeError::Timeout)??;

        let ClientFrame::Authenticate { user_id } = frame;
        if user_id != owner {
            return Err(HandshakeError::IdentityMismatch);
        }
        match self.store.find_user(user_id).await {
            Ok(Some(user)) if !user.is_deleted() => Ok(user_id),
            Ok(_) => Err(HandshakeError::UnknownUser),
            Err(e) => Err(HandshakeError::Lookup(e.to_string())),
        }
    }
}
