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

use marketplace_relay::adapters::{self, Store};
use marketplace_relay::api::MgmtState;
use marketplace_relay::config::Config;
use marketplace_relay::{AppBuilder, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::Instrument;

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let pool = adapters::database::init_pool(&config.database.url, &config.database).await?;
    marketplace_relay::run_migrations(&pool).await?;
    Ok(Arc::new(adapters::database::PgStore::new(pool)))
}

async fn serve(
    listener: TcpListener,
    router: axum::Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&stop| stop).await;
        })
        .await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;
    marketplace_relay::setup_panic_hook();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (app, api_listener, mgmt_listener) = async {
        let store = open_store(&config).await?;
        let app = AppBuilder::new(config.clone()).with_store(store).build()?;

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;
        let api_listener = TcpListener::bind(api_addr).await?;
        let mgmt_listener = TcpListener::bind(mgmt_addr).await?;

        tracing::info!(address = %api_addr, push_enabled = config.notifications.push_enabled, "API listening");
        tracing::info!(address = %mgmt_addr, "Management listening");
        Ok::<_, anyhow::Error>((app, api_listener, mgmt_listener))
    }
    .instrument(tracing::info_span!("boot_server"))
    .await?;

    marketplace_relay::spawn_signal_handler(shutdown_tx.clone());

    let api_router = marketplace_relay::api::app_router(config.clone(), app.services, shutdown_rx.clone());
    let mgmt_router = marketplace_relay::api::mgmt_router(MgmtState { health_service: app.health_service });
    let worker_tasks = app.workers.spawn_all(shutdown_rx.clone());

    if let Err(e) = tokio::try_join!(
        serve(api_listener, api_router, shutdown_rx.clone()),
        serve(mgmt_listener, mgmt_router, shutdown_rx),
    ) {
        tracing::error!(error = %e, "Server error");
    }

    // Either server failing also stops the workers.
    let _ = shutdown_tx.send(true);
    let drain = futures::future::join_all(worker_tasks);
    if tokio::time::timeout(Duration::from_secs(config.server.shutdown_timeout_secs), drain).await.is_ok() {
        tracing::info!("Background tasks finished");
    } else {
        tracing::warn!("Timed out waiting for background tasks");
    }

    telemetry_guard.shutdown();
    Ok(())
}
