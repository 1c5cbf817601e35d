//! In-memory event store: a Sink plus the read path for recent events.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::EventSink;
use crate::core::EventRecord;
use crate::errors::SinkError;
use crate::utils::{now_utc, Timestamp};

/// A record as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Store-assigned id.
    pub id: Uuid,
    /// When the write was accepted.
    pub stored_at: Timestamp,
    /// The persisted payload, unchanged from what was enqueued.
    #[serde(flatten)]
    pub record: EventRecord,
}

/// Read access to persisted events.
#[async_trait]
pub trait EventQueries: Send + Sync {
    /// The most recent `limit` events, newest timestamp first.
    async fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>, SinkError>;
}

/// Thread-safe in-memory store.
///
/// Writes become visible to [`EventQueries::recent`] as soon as they return.
/// The store can be switched offline, in which case both writes and reads
/// fail with [`SinkError::Unavailable`].
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
    offline: AtomicBool,
}

impl InMemoryEventStore {
    /// Creates an empty, online store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store offline or back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns whether the store currently refuses requests.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// All stored events in write order.
    #[must_use]
    pub fn all(&self) -> Vec<StoredEvent> {
        self.events.read().clone()
    }

    fn ensure_online(&self) -> Result<(), SinkError> {
        if self.is_offline() {
            Err(SinkError::Unavailable("event store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventSink for InMemoryEventStore {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.ensure_online()?;
        self.events.write().push(StoredEvent {
            id: Uuid::now_v7(),
            stored_at: now_utc(),
            record: record.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[async_trait]
impl EventQueries for InMemoryEventStore {
    async fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>, SinkError> {
        self.ensure_online()?;

        // Newest write first so that equal timestamps keep that order after the stable sort
        let mut events: Vec<StoredEvent> = self.events.read().iter().rev().cloned().collect();
        events.sort_by(|a, b| b.record.timestamp().cmp(&a.record.timestamp()));
        events.truncate(limit);
        Ok(events)
    }
}
