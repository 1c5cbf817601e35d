//! Ordered single-consumer event queue.
//!
//! Producers call [`EventQueue::enqueue`] from any task; the call takes one
//! mutex, appends, and returns a [`TaskHandle`]. One worker task drains the
//! buffer, making exactly one Sink call at a time. Failed tasks wait out their
//! retry delay in a separate heap and rejoin the ready line at the position
//! their eligibility time earns them, behind anything that was already
//! waiting by then.

use futures::FutureExt;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::handle::{TaskHandle, TaskOutcome};
use super::{with_retry, QueueConfig, QueueMetrics, QueueStats, RetryDecision, RetryPolicy};
use crate::core::{EventRecord, Task};
use crate::errors::{IngestError, SinkError};
use crate::events::EventSink;
use crate::observability::SpanTimer;

/// A task together with the channel its outcome is reported on.
struct QueuedTask {
    task: Task,
    /// When the task joined the ready line: arrival for new tasks, the end of
    /// the retry delay for rescheduled ones.
    ready_at: Instant,
    responder: oneshot::Sender<TaskOutcome>,
}

impl QueuedTask {
    fn resolve(self, outcome: TaskOutcome) {
        // The producer may have dropped its handle; the outcome is then unobserved
        let _ = self.responder.send(outcome);
    }
}

/// A rescheduled task waiting for its retry delay.
struct Delayed {
    eligible_at: Instant,
    entry: QueuedTask,
}

impl Delayed {
    fn key(&self) -> (Instant, u64) {
        (self.eligible_at, self.entry.task.sequence())
    }
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed so the BinaryHeap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Default)]
struct QueueState {
    /// Eligible tasks, sorted by `ready_at`.
    ready: VecDeque<QueuedTask>,
    delayed: BinaryHeap<Delayed>,
    in_flight: bool,
    next_sequence: u64,
    closed: bool,
    drain_on_close: bool,
}

impl QueueState {
    fn pending_len(&self) -> usize {
        self.ready.len() + self.delayed.len()
    }

    /// Moves every delayed task whose deadline has passed into the ready line.
    fn promote_due(&mut self, now: Instant) {
        while self.delayed.peek().is_some_and(|d| d.eligible_at <= now) {
            let Some(Delayed { eligible_at, mut entry }) = self.delayed.pop() else {
                break;
            };
            entry.ready_at = eligible_at;
            let position = self.ready.partition_point(|e| e.ready_at <= eligible_at);
            self.ready.insert(position, entry);
        }
    }

    fn take_pending(&mut self) -> Vec<QueuedTask> {
        let mut abandoned: Vec<QueuedTask> = self.ready.drain(..).collect();
        abandoned.extend(self.delayed.drain().map(|d| d.entry));
        abandoned
    }
}

/// Worker lifecycle. Only the `stop` call that moves it to `Stopping` may
/// resolve leftover tasks; later calls wait for `Stopped`.
enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    Stopping,
    Stopped,
}

struct Inner {
    sink: Arc<dyn EventSink>,
    config: QueueConfig,
    state: Mutex<QueueState>,
    notify: Notify,
    metrics: QueueMetrics,
    lifecycle: Mutex<Lifecycle>,
    stopped: watch::Sender<bool>,
}

/// The event ingestion queue.
///
/// Cloning is cheap and yields another handle to the same queue. The worker
/// runs between [`start`](Self::start) and [`stop`](Self::stop); records
/// enqueued before `start` wait in the buffer. Nothing is persisted: pending
/// tasks are lost if the process dies.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("sink", &self.inner.sink.name())
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl EventQueue {
    /// Creates a stopped queue in front of `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                config,
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                metrics: QueueMetrics::default(),
                lifecycle: Mutex::new(Lifecycle::Idle),
                stopped: watch::Sender::new(false),
            }),
        }
    }

    /// Creates a stopped queue with the default configuration.
    #[must_use]
    pub fn with_defaults(sink: Arc<dyn EventSink>) -> Self {
        Self::new(sink, QueueConfig::default())
    }

    /// Spawns the worker on the current tokio runtime.
    ///
    /// Returns false if the worker is already running or the queue was stopped.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Idle) || self.inner.state.lock().closed {
            return false;
        }

        *lifecycle = Lifecycle::Running(self.spawn_worker());
        info!(sink = self.inner.sink.name(), "Event queue worker started");
        true
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(&self.inner).run())
    }

    /// Stops the queue.
    ///
    /// New enqueues are refused immediately. With `drain`, the worker keeps
    /// going until every pending task (retries included) has finished;
    /// otherwise it stops after the in-flight task. Tasks left behind resolve
    /// with [`IngestError::QueueClosed`].
    ///
    /// Draining a queue that was never started spawns the worker for the
    /// drain. The first call decides whether to drain; concurrent or later
    /// calls return once that stop has completed.
    pub async fn stop(&self, drain: bool) {
        let drain = {
            let mut state = self.inner.state.lock();
            if !state.closed {
                state.closed = true;
                state.drain_on_close = drain;
            }
            state.drain_on_close
        };
        self.inner.notify.notify_one();

        let (owner, worker) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running(handle) => (true, Some(handle)),
                Lifecycle::Idle if drain => (true, Some(self.spawn_worker())),
                Lifecycle::Idle => (true, None),
                other => {
                    *lifecycle = other;
                    (false, None)
                }
            }
        };
        if !owner {
            self.wait_stopped().await;
            return;
        }

        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(error = %e, "Event queue worker ended abnormally");
            }
        }

        let abandoned = self.inner.state.lock().take_pending();
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "Event queue stopped with pending tasks");
        }
        for entry in abandoned {
            entry.resolve(Err(IngestError::QueueClosed));
        }

        *self.inner.lifecycle.lock() = Lifecycle::Stopped;
        self.inner.stopped.send_replace(true);
    }

    async fn wait_stopped(&self) {
        let mut stopped = self.inner.stopped.subscribe();
        // The sender lives in `Inner`, so the channel cannot close while we hold `self`
        let _ = stopped.wait_for(|done| *done).await;
    }

    /// Appends a record to the queue and returns immediately.
    ///
    /// The returned handle resolves when the task succeeds or is finalized as
    /// failed. A rejected call leaves nothing behind, so it is safe to call
    /// again with the same record.
    pub fn enqueue(&self, record: EventRecord) -> Result<TaskHandle, IngestError> {
        let (tx, rx) = oneshot::channel();

        let task_id = {
            let mut state = self.inner.state.lock();
            if let Err(e) = self.admit(&state) {
                drop(state);
                self.inner.metrics.record_rejected();
                return Err(e);
            }

            let task = Task::new(state.next_sequence, record);
            state.next_sequence += 1;
            let task_id = task.id();
            debug!(
                task_id = %task_id,
                sequence = task.sequence(),
                event_type = %task.record().event_type(),
                "Event enqueued"
            );
            state.ready.push_back(QueuedTask {
                task,
                ready_at: Instant::now(),
                responder: tx,
            });
            task_id
        };

        self.inner.metrics.record_enqueued();
        self.inner.notify.notify_one();
        Ok(TaskHandle::new(task_id, rx))
    }

    /// Enqueues through the coarse producer-side retry.
    ///
    /// Only rejections that can clear on their own (a full buffer) are
    /// retried; this layer never looks at Sink outcomes.
    pub async fn enqueue_with_retry(
        &self,
        record: EventRecord,
        policy: &RetryPolicy,
    ) -> Result<TaskHandle, IngestError> {
        with_retry(policy, "enqueue", IngestError::is_retryable, || {
            let record = record.clone();
            async move { self.enqueue(record) }
        })
        .await
    }

    /// Enqueues and waits for the terminal outcome.
    pub async fn submit(&self, record: EventRecord) -> TaskOutcome {
        self.enqueue(record)?.await
    }

    fn admit(&self, state: &QueueState) -> Result<(), IngestError> {
        if state.closed {
            return Err(IngestError::QueueClosed);
        }
        match self.inner.config.capacity {
            Some(capacity) if state.pending_len() >= capacity => {
                Err(IngestError::QueueFull { capacity })
            }
            _ => Ok(()),
        }
    }

    /// Tasks not yet in a terminal state, the in-flight one included.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.inner.state.lock();
        state.pending_len() + usize::from(state.in_flight)
    }

    /// Returns true if no task is pending or in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the worker has been started and not yet stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.inner.lifecycle.lock(), Lifecycle::Running(_))
    }

    /// Returns whether the queue refuses new records.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// The queue configuration.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Raw counters.
    #[must_use]
    pub fn metrics(&self) -> &QueueMetrics {
        &self.inner.metrics
    }

    /// Counters plus current buffer occupancy.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let (pending, in_flight) = {
            let state = self.inner.state.lock();
            (state.pending_len(), usize::from(state.in_flight))
        };
        self.inner.metrics.snapshot(pending, in_flight)
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        while let Some(entry) = self.next_task().await {
            self.process(entry).await;
        }
        info!("Event queue worker stopped");
    }

    /// Waits for the next eligible task and marks it in flight.
    ///
    /// Returns `None` once the queue is closed and, when draining, empty.
    async fn next_task(&self) -> Option<QueuedTask> {
        loop {
            let deadline = {
                let mut state = self.state.lock();
                state.promote_due(Instant::now());

                if state.closed && !state.drain_on_close {
                    return None;
                }
                if let Some(mut entry) = state.ready.pop_front() {
                    entry.task.begin_attempt();
                    state.in_flight = true;
                    return Some(entry);
                }
                if state.closed && state.delayed.is_empty() {
                    return None;
                }
                state.delayed.peek().map(|d| d.eligible_at)
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = self.notify.notified() => {}
                        () = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    async fn process(&self, mut entry: QueuedTask) {
        let task_id = entry.task.id();
        let attempt = entry.task.attempts();
        let event_type = entry.task.record().event_type();

        self.metrics.record_sink_call();
        let timer = SpanTimer::start("sink.write");
        let result = self.write_once(entry.task.record()).await;
        let duration_ms = timer.finish();

        match result {
            Ok(()) => {
                entry.task.mark_succeeded();
                self.state.lock().in_flight = false;
                self.metrics.record_success();
                info!(
                    task_id = %task_id,
                    event_type = %event_type,
                    attempt,
                    duration_ms,
                    "Event saved"
                );
                let receipt = entry.task.receipt();
                entry.resolve(Ok(receipt));
            }
            Err(sink_error) => match self.config.retry.decide(attempt) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        task_id = %task_id,
                        event_type = %event_type,
                        attempt,
                        max_attempts = self.config.retry.attempt_limit(),
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %sink_error,
                        "Event write failed, retry scheduled"
                    );
                    let eligible_at = Instant::now() + delay;
                    entry.task.reschedule(sink_error);
                    self.metrics.record_retry();
                    {
                        let mut state = self.state.lock();
                        state.in_flight = false;
                        state.delayed.push(Delayed { eligible_at, entry });
                    }
                }
                RetryDecision::GiveUp => {
                    error!(
                        task_id = %task_id,
                        event_type = %event_type,
                        attempts = attempt,
                        error = %sink_error,
                        "Event write failed permanently"
                    );
                    entry.task.mark_failed_final(sink_error.clone());
                    self.state.lock().in_flight = false;
                    self.metrics.record_failure();
                    entry.resolve(Err(IngestError::RetriesExhausted {
                        task_id,
                        attempts: attempt,
                        last_error: sink_error,
                    }));
                }
            },
        }
    }

    /// One Sink call, with timeouts and panics folded into `SinkError`.
    async fn write_once(&self, record: &EventRecord) -> Result<(), SinkError> {
        let write = AssertUnwindSafe(self.sink.write(record)).catch_unwind();

        let caught = match self.config.sink_timeout() {
            Some(limit) => match tokio::time::timeout(limit, write).await {
                Ok(caught) => caught,
                Err(_) => return Err(SinkError::Timeout(limit)),
            },
            None => write.await,
        };

        caught.unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SinkError::Panicked(message))
        })
    }
}
