//! Request handlers for the ingestion API.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::AppState;
use crate::core::EventRecord;
use crate::errors::{IngestError, ValidationError};
use crate::queue::TaskHandle;

/// Query string of `GET /api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentEventsQuery {
    /// Page size; capped at the configured limit.
    pub limit: Option<usize>,
}

fn status_for(err: &IngestError) -> StatusCode {
    match err {
        IngestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (status_for(&self), Json(self.to_body())).into_response()
    }
}

/// `POST /api/events`
pub async fn ingest_event(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(payload) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return IngestError::from(ValidationError::Malformed(rejection.body_text()))
                .into_response()
        }
    };

    let record = match EventRecord::try_from(payload) {
        Ok(record) => record,
        Err(e) => {
            debug!(error = %e, "Rejected event payload");
            return IngestError::from(e).into_response();
        }
    };

    match state
        .queue
        .enqueue_with_retry(record, &state.accept_retry)
        .await
    {
        Ok(handle) => {
            tokio::spawn(report_outcome(handle));
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": "Event queued for processing" })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Event could not be queued");
            e.into_response()
        }
    }
}

async fn report_outcome(handle: TaskHandle) {
    let task_id = handle.task_id();
    match handle.await {
        Ok(receipt) => debug!(
            task_id = %task_id,
            attempts = receipt.attempts,
            "Queued event persisted"
        ),
        Err(e) => error!(task_id = %task_id, error = %e, "Queued event was not persisted"),
    }
}

/// `GET /api/events`
pub async fn list_recent_events(
    State(state): State<AppState>,
    Query(query): Query<RecentEventsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(state.recent_limit)
        .min(state.recent_limit);

    match state.queries.recent(limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read recent events");
            IngestError::Internal(e.to_string()).into_response()
        }
    }
}

/// `GET /api/queue/stats`
pub async fn queue_stats(State(state): State<AppState>) -> Response {
    Json(state.queue.stats()).into_response()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::events::{EventSink, InMemoryEventStore};
    use crate::http::{router, AppState};
    use crate::queue::{EventQueue, QueueConfig, RetryPolicy};
    use crate::testing::{click_event, click_payload, scroll_event};

    fn app_with(store: Arc<InMemoryEventStore>, config: QueueConfig) -> (Router, EventQueue) {
        let queue = EventQueue::new(store.clone(), config);
        let state = AppState::new(queue.clone(), store)
            .with_accept_retry(RetryPolicy::new().with_max_attempts(1))
            .with_recent_limit(2);
        (router(state), queue)
    }

    fn post_event(body: impl Into<Body>) -> Request<Body> {
        Request::post("/api/events")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_event_returns_202_and_is_persisted() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, queue) = app_with(store.clone(), QueueConfig::default());
        queue.start();

        let response = app
            .oneshot(post_event(click_payload().to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": "Event queued for processing" })
        );

        queue.stop(true).await;
        let stored = store.all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].record.element(), "BUTTON#test-btn-1");
        assert_eq!(stored[0].record.path(), Some("/checkout"));
    }

    #[tokio::test]
    async fn test_unknown_event_type_returns_422() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, queue) = app_with(store, QueueConfig::default());

        let response = app
            .oneshot(post_event(r#"{"type":"keypress","element":"INPUT"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "validation_error");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_returns_422() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, _queue) = app_with(store, QueueConfig::default());

        let response = app.oneshot(post_event("not-json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_full_queue_returns_503() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, queue) = app_with(store, QueueConfig::new().with_capacity(1));
        let _occupant = queue.enqueue(click_event()).unwrap();

        let response = app
            .oneshot(post_event(click_payload().to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["code"], "queue_full");
    }

    #[tokio::test]
    async fn test_closed_queue_returns_500() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, queue) = app_with(store, QueueConfig::default());
        queue.stop(false).await;

        let response = app
            .oneshot(post_event(click_payload().to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_recent_events_respect_limit() {
        let store = Arc::new(InMemoryEventStore::new());
        for record in [click_event(), scroll_event(), click_event()] {
            store.write(&record).await.unwrap();
        }
        let (app, _queue) = app_with(store, QueueConfig::default());

        let response = app
            .oneshot(
                Request::get("/api/events?limit=50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let events = json_body(response).await;
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].get("storedAt").is_some());
        assert!(events[0].get("type").is_some());
    }

    #[tokio::test]
    async fn test_offline_store_returns_500() {
        let store = Arc::new(InMemoryEventStore::new());
        store.set_offline(true);
        let (app, _queue) = app_with(store, QueueConfig::default());

        let response = app
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_stats_report_queue_counts() {
        let store = Arc::new(InMemoryEventStore::new());
        let (app, queue) = app_with(store, QueueConfig::default());
        let _pending = queue.enqueue(click_event()).unwrap();

        let response = app
            .oneshot(
                Request::get("/api/queue/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stats = json_body(response).await;
        assert_eq!(stats["enqueued"], 1);
        assert_eq!(stats["pending"], 1);
    }
}
