//! HTTP surface for the ingestion queue.
//!
//! `POST /api/events` validates a payload and enqueues it, answering 202 as
//! soon as the queue has accepted the record. Persistence happens later on the
//! worker; its outcome is only logged. `GET /api/events` reads back the most
//! recent stored events and `GET /api/queue/stats` reports queue counters.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::events::EventQueries;
use crate::queue::{EventQueue, RetryPolicy};

pub use handlers::{ingest_event, list_recent_events, queue_stats, RecentEventsQuery};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The queue records are submitted to.
    pub queue: EventQueue,
    /// Read path for stored events.
    pub queries: Arc<dyn EventQueries>,
    /// Producer-side retry applied when the queue refuses a record.
    pub accept_retry: RetryPolicy,
    /// Default and maximum number of events returned by the read endpoint.
    pub recent_limit: usize,
}

impl AppState {
    /// Creates state with the default accept policy and a limit of 100.
    #[must_use]
    pub fn new(queue: EventQueue, queries: Arc<dyn EventQueries>) -> Self {
        Self {
            queue,
            queries,
            accept_retry: RetryPolicy::producer_default(),
            recent_limit: 100,
        }
    }

    /// Sets the producer-side retry policy.
    #[must_use]
    pub fn with_accept_retry(mut self, policy: RetryPolicy) -> Self {
        self.accept_retry = policy;
        self
    }

    /// Sets the recent-events limit.
    #[must_use]
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/events", post(ingest_event).get(list_recent_events))
        .route("/api/queue/stats", get(queue_stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
