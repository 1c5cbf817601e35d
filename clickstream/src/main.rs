//! Clickstream ingestion server.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use clickstream::config::ServerConfig;
use clickstream::events::{InMemoryEventStore, LoggingEventSink};
use clickstream::http::{router, AppState};
use clickstream::observability::init_tracing;
use clickstream::queue::EventQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format, "clickstream=info,tower_http=info");

    let store = Arc::new(InMemoryEventStore::new());
    let sink = Arc::new(LoggingEventSink::new(Arc::clone(&store)));
    let queue = EventQueue::new(sink, config.queue.clone());
    queue.start();

    let state = AppState::new(queue.clone(), store)
        .with_accept_retry(config.accept_retry.clone())
        .with_recent_limit(config.recent_events_limit);
    let app = router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "Clickstream server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining event queue");
    queue.stop(true).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
