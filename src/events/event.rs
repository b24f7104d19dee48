//! # Runtime events emitted by the queue and its task handles.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Task events**: submission, dispatch, completion, retry, deletion
//! - **Queue events**: pause, resume, delete, purge
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! task name, attempt numbers, and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task events ===
    /// Task registered and scheduled.
    ///
    /// Sets: `task`, `at`, `seq`.
    TaskSubmitted,

    /// A worker slot started an attempt for the task.
    ///
    /// Sets: `task`, `attempt`, `at`, `seq`.
    TaskDispatched,

    /// Task completed successfully (terminal; completion callback fired).
    ///
    /// Sets: `task`, `attempt`, `at`, `seq`.
    TaskSucceeded,

    /// Task completed as failed (terminal; attempts exhausted or fatal error).
    ///
    /// Sets: `task`, `attempt`, `reason`, `at`, `seq`.
    TaskFailed,

    /// A failed attempt was rescheduled for retry.
    ///
    /// Sets: `task`, `attempt` (the failed one), `delay_ms`, `reason`, `at`, `seq`.
    RetryScheduled,

    /// Task deleted before completing; it will never fire.
    ///
    /// Sets: `task`, `at`, `seq`.
    TaskDeleted,

    // === Queue events ===
    /// Queue paused; dispatcher and workers stopped, tokens keep minting.
    ///
    /// Sets: `queue`, `at`, `seq`.
    QueuePaused,

    /// Queue resumed; dispatcher and workers restarted.
    ///
    /// Sets: `queue`, `at`, `seq`.
    QueueResumed,

    /// Queue deleted; all loops stopped, tasks purged.
    ///
    /// Sets: `queue`, `at`, `seq`.
    QueueDeleted,

    /// Purge requested; every registered task is being deleted.
    ///
    /// Sets: `queue`, `at`, `seq`.
    QueuePurged,
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Name of the queue, if applicable.
    pub queue: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Retry delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (attempt errors, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            queue: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a queue name.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
