// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::application::poller::ReadingConsumer;
use crate::application::sync_controller::SyncController;
use crate::domain::reading::Reading;
use crate::infrastructure::config::load_sync_config;
use crate::infrastructure::http_transport::HttpTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let sync_config = load_sync_config().context("failed to load sync configuration")?;

    // Create transport (infrastructure layer)
    let transport = Arc::new(
        HttpTransport::new(
            sync_config.api.base_url.clone(),
            sync_config.api.request_timeout(),
        )
        .context("failed to build HTTP client")?,
    );

    // Latest delivered reading, shared with the status API
    let (latest_tx, latest_rx) = watch::channel(None);
    let consumer: ReadingConsumer = Arc::new(move |reading: Reading| {
        latest_tx.send_replace(Some(reading));
    });

    // Start the sync loops (application layer)
    let mut controller = SyncController::new(
        transport,
        sync_config.schedule.to_schedule(),
        consumer,
    );
    if let Err(e) = controller.activate(sync_config.session.to_session()).await {
        tracing::warn!(error = %e, "sync session not started; reporting disconnected");
    }

    // Surface connection state changes in the service log
    let mut states = controller.health().subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            tracing::info!(%state, "connection state");
        }
    });

    let state = Arc::new(AppState {
        health: controller.health(),
        latest_reading: latest_rx,
    });

    // Start server (presentation layer)
    let addr: SocketAddr = sync_config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", sync_config.server.listen_addr))?;
    tracing::info!(%addr, "starting pond-sync status API");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to install ctrl-c handler; shutting down");
            }
        })
        .await?;

    controller.deactivate().await;
    tracing::info!("pond-sync stopped");

    Ok(())
}
