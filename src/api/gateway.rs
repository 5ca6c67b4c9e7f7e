use crate::api::AppState;
use crate::domain::auth::Claims;
use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::Extensions,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_http::request_id::RequestId;

#[derive(Deserialize)]
pub struct GatewayParams {
    token: Option<String>,
}

/// Upgrades to the push channel. The `token` query parameter names the channel's owner and
/// the first frame must authenticate as that same user.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<GatewayParams>,
    extensions: Extensions,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let request_id = extensions
        .get::<RequestId>()
        .map(|id| id.header_value().to_str().unwrap_or_default().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Bad tokens still upgrade; the session closes them with 1008.
    let owner = params.token.as_deref().and_then(|token| match Claims::decode(token, &state.config.auth.jwt_secret) {
        Ok(claims) => Some(claims.sub),
        Err(e) => {
            tracing::debug!(%request_id, error = %e, "Gateway token rejected");
            None
        }
    });

    let gateway = state.gateway_service.clone();
    let shutdown_rx = state.shutdown_rx.clone();
    ws.on_upgrade(move |socket| async move { gateway.handle_socket(socket, owner, request_id, shutdown_rx).await })
}
