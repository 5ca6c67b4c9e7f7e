use crate::domain::push::{ClientFrame, ServerEvent};
use crate::domain::user::UserId;
use crate::services::connection_registry::{ChannelId, ConnectionRegistry};
use crate::services::gateway::Metrics;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use opentelemetry::KeyValue;
use tokio::sync::{mpsc, watch};

/// One authenticated push channel. Outbound frames come from the registry; inbound
/// frames carry nothing actionable once the handshake is done.
pub(crate) struct Session {
    pub(crate) user_id: UserId,
    pub(crate) request_id: String,
    pub(crate) channel_id: ChannelId,
    pub(crate) socket: WebSocket,
    pub(crate) outbound_rx: mpsc::Receiver<ServerEvent>,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) metrics: Metrics,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

impl Session {
    #[tracing::instrument(
        name = "websocket_session",
        skip(self),
        fields(
            user_id = self.user_id,
            request_id = %self.request_id,
            channel_id = %self.channel_id,
            otel.kind = "server"
        )
    )]
    pub(crate) async fn run(self) {
        let Self { channel_id, socket, mut outbound_rx, registry, metrics, mut shutdown_rx, .. } = self;

        metrics.active_connections.add(1, &[]);
        tracing::info!("WebSocket connected");

        let (mut ws_sink, mut ws_stream) = socket.split();

        loop {
            if *shutdown_rx.borrow() {
                tracing::info!("Shutdown signal received, closing WebSocket");
                let _ = ws_sink
                    .send(WsMessage::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: "Server shutting down".into(),
                    })))
                    .await;
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {}

                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => match ClientFrame::decode(text.as_str()) {
                            Ok(ClientFrame::Authenticate { .. }) => {
                                tracing::debug!("Ignoring repeated authenticate frame");
                            }
                            Err(e) => tracing::warn!(error = %e, "Ignoring invalid client frame"),
                        },
                        Some(Ok(WsMessage::Binary(_))) => tracing::warn!("Ignoring unexpected binary frame"),
                        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                            tracing::trace!("Heartbeat");
                        }
                        Some(Ok(WsMessage::Close(_)) | Err(_)) | None => break,
                    }
                }

                event = outbound_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match event.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, event = event.label(), "Failed to encode push frame");
                            continue;
                        }
                    };
                    if ws_sink.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                    metrics.frames_sent_total.add(1, &[KeyValue::new("event", event.label())]);
                }
            }
        }

        registry.unregister(channel_id);
        let _ = ws_sink.close().await;

        metrics.active_connections.add(-1, &[]);
        tracing::info!("WebSocket disconnected");
    }
}
