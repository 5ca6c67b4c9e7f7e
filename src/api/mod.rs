use crate::api::rate_limit::{IpKeyExtractor, log_rate_limit_events};
use crate::config::Config;
use crate::services::badge_service::BadgeService;
use crate::services::conversation_service::ConversationService;
use crate::services::gateway::GatewayService;
use crate::services::health_service::HealthService;
use crate::services::notification_service::NotificationService;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod categories;
pub mod conversations;
pub mod gateway;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod rate_limit;
pub mod schemas;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub conversation_service: ConversationService,
    pub notification_service: NotificationService,
    pub badge_service: BadgeService,
    pub gateway_service: GatewayService,
    pub shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub conversation_service: ConversationService,
    pub notification_service: NotificationService,
    pub badge_service: BadgeService,
    pub gateway_service: GatewayService,
}

/// Configures and returns the primary application router.
///
/// The push gateway is only mounted when push is enabled; every REST route works either way.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
pub fn app_router(
    config: Config,
    services: ServiceContainer,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Router {
    let interval_ns = 1_000_000_000 / config.rate_limit.per_second.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(interval_ns))
            .burst_size(config.rate_limit.burst)
            .key_extractor(IpKeyExtractor::new(config.server.trusted_proxies.clone()))
            .finish()
            .expect("Failed to build rate limiter config"),
    );

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
    let push_enabled = config.notifications.push_enabled;

    let state = AppState {
        config,
        conversation_service: services.conversation_service,
        notification_service: services.notification_service,
        badge_service: services.badge_service,
        gateway_service: services.gateway_service,
        shutdown_rx,
    };

    let rest_routes = Router::new()
        .route("/conversations", get(conversations::list_conversations).post(conversations::create_conversation))
        .route("/conversations/{id}/messages", get(conversations::list_messages))
        .route("/conversations/{id}/system-messages", post(conversations::post_system_message))
        .route("/messages", post(messages::send_message))
        .route("/messages/unread-count", get(messages::unread_count))
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/notifications", get(notifications::list_notifications).post(notifications::create_notification))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/category-counts", get(categories::category_counts))
        .route("/notifications/mark-all-read", patch(notifications::mark_all_read))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .route("/notifications/{id}", delete(notifications::delete_notification))
        .route("/categories/{category}/viewed", put(categories::mark_viewed))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout));

    let mut api_routes = rest_routes;
    if push_enabled {
        api_routes = api_routes.route("/gateway", get(gateway::websocket_handler));
    }

    Router::new()
        .nest("/v1", api_routes.layer(GovernorLayer::new(governor_conf)))
        .layer(from_fn(log_rate_limit_events))
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            middleware::MakeRequestUuidOrHeader,
        ))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
