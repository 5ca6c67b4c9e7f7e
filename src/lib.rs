#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::Store;
use crate::adapters::database::DbPool;
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::services::badge_service::BadgeService;
use crate::services::broadcast_hub::BroadcastHub;
use crate::services::connection_registry::ConnectionRegistry;
use crate::services::conversation_service::ConversationService;
use crate::services::event_bus::EventBus;
use crate::services::gateway::GatewayService;
use crate::services::health_service::HealthService;
use crate::services::notification_service::NotificationService;
use crate::workers::BroadcastWorker;
use std::sync::Arc;
use tokio::sync::watch;

pub use crate::workers::Workers;

/// Everything the binary (or a test harness) needs to serve traffic.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub registry: ConnectionRegistry,
    pub workers: Workers,
}

/// Wires services together. Performs no I/O; infrastructure is handed in.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn Store>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// # Errors
    /// Returns an error if no store was provided.
    pub fn build(self) -> anyhow::Result<App> {
        let store = self.store.ok_or_else(|| anyhow::anyhow!("AppBuilder requires a store"))?;
        let config = self.config;

        let events = EventBus::new(config.notifications.event_bus_capacity);
        let registry = ConnectionRegistry::new();

        let badge_service = BadgeService::new(Arc::clone(&store), events.clone());
        let conversation_service =
            ConversationService::new(Arc::clone(&store), events.clone(), config.messaging.clone());
        let notification_service = NotificationService::new(Arc::clone(&store), events.clone(), &config.notifications);
        let gateway_service = GatewayService::new(Arc::clone(&store), registry.clone(), config.websocket.clone());
        let health_service = HealthService::new(
            Arc::clone(&store),
            events.clone(),
            config.notifications.push_enabled,
            config.server.health_db_timeout_ms,
        );

        // Subscribing here, before anything can publish, keeps startup events.
        let broadcast = config.notifications.push_enabled.then(|| {
            let hub = BroadcastHub::new(registry.clone(), badge_service.clone());
            BroadcastWorker::new(hub, registry.clone(), events.subscribe(), config.notifications.gc_interval_secs)
        });

        Ok(App {
            services: ServiceContainer { conversation_service, notification_service, badge_service, gateway_service },
            health_service,
            registry,
            workers: Workers { broadcast },
        })
    }
}

/// Applies pending schema migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Flips `shutdown_tx` on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(%location, %payload, "Process panicked");
    }));
}
