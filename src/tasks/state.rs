//! # Caller-visible declared task state.
//!
//! [`TaskState`] is what the queue owner sees: the submitted parameters plus
//! the counters and status the engine maintains. `submit_task` returns a
//! clone taken at registration time, and the completion callback receives a
//! terminal snapshot; neither aliases the engine's live copy.

use std::time::{Duration, SystemTime};

/// Lifecycle status of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Registered and waiting for its schedule timer / next attempt.
    Scheduled,
    /// Terminal: an attempt succeeded; the completion callback has fired.
    Succeeded,
    /// Terminal: attempts exhausted or a fatal error; callback has fired.
    Failed,
    /// Terminal: deleted before completing; the callback never fires.
    Deleted,
}

/// Declared state of a task on a queue.
#[derive(Clone, Debug)]
pub struct TaskState {
    /// Unique name within the owning queue.
    pub name: String,
    /// Delay between submission and the first dispatch attempt.
    pub delay: Duration,
    /// Number of attempts started so far.
    pub dispatch_count: u32,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Submission timestamp.
    pub created_at: SystemTime,
    /// Message of the most recent failed attempt, if any.
    pub last_error: Option<String>,
}

impl TaskState {
    /// Creates the state for a task that fires immediately once dispatched.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: Duration::ZERO,
            dispatch_count: 0,
            status: TaskStatus::Scheduled,
            created_at: SystemTime::now(),
            last_error: None,
        }
    }

    /// Sets the delay before the first dispatch attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns `true` once the task reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, TaskStatus::Scheduled)
    }
}
