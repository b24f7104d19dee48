//! # TaskHandle: engine-owned handle for one queued task.
//!
//! Drives a single task through its lifecycle:
//! - schedule timer → self-offer on the dispatch-request channel,
//! - one attempt per pass through the dispatcher,
//! - retry per [`RetryPolicy`] (each retry re-enters the dispatch path and
//!   consumes a fresh rate token),
//! - exactly-once terminal completion or deletion.
//!
//! ## Flow
//! ```text
//! schedule() ──► [sleep(delay)] ──► fire channel ──► Dispatcher ──► WorkerPool
//!                                                                      │
//!                                   attempt() ◄───────────────────────┘
//!                                      │
//!                   Ok ──► complete(Succeeded) ──► on_done (once)
//!                   Err(retryable, budget left)
//!                      ──► schedule_after(retry delay) ──► fire channel ...
//!                   Err(otherwise) ──► complete(Failed) ──► on_done (once)
//!
//! delete() at any point: cancels pending timers/offers, suppresses the
//! completion callback, and makes attempt() a no-op.
//! ```
//!
//! ## Rules
//! - The terminal transition is guarded by an atomic swap: completion and
//!   deletion race safely and exactly one of them wins.
//! - `delete()` is safe before or after firing; an in-flight attempt keeps
//!   its worker slot until it returns, but its result is discarded.
//! - The handle never blocks the caller: timers and offers run as spawned
//!   tasks that observe the handle's cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::policies::RetryPolicy;
use crate::tasks::state::{TaskState, TaskStatus};
use crate::tasks::task::Task;

/// Shared reference to a [`TaskHandle`].
pub type TaskRef = Arc<TaskHandle>;

/// Callback invoked with the terminal state snapshot of a completed task.
pub(crate) type DoneCallback = Arc<dyn Fn(&TaskState) + Send + Sync>;

/// Engine-owned handle for one queued task.
pub struct TaskHandle {
    /// Task name, fixed at submission.
    name: Arc<str>,
    /// Mutable declared state; snapshots are cloned out under the lock.
    state: Mutex<TaskState>,
    /// User attempt logic.
    runner: Arc<dyn Task>,
    /// Dispatch-request channel shared with the queue's dispatcher.
    fire: mpsc::Sender<TaskRef>,
    /// Retry policy inherited from the queue configuration.
    retry: RetryPolicy,
    /// Cancelled on deletion or completion; stops timers and offers.
    cancel: CancellationToken,
    /// Set once by the terminal transition (complete or delete).
    done: AtomicBool,
    /// Completion callback; wraps registry removal and the owner's callback.
    on_done: DoneCallback,
    /// Queue event bus.
    bus: Bus,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("done", &self.done.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub(crate) fn new(
        state: TaskState,
        runner: Arc<dyn Task>,
        fire: mpsc::Sender<TaskRef>,
        retry: RetryPolicy,
        bus: Bus,
        on_done: DoneCallback,
    ) -> TaskRef {
        Arc::new(Self {
            name: Arc::from(state.name.as_str()),
            state: Mutex::new(state),
            runner,
            fire,
            retry,
            cancel: CancellationToken::new(),
            done: AtomicBool::new(false),
            on_done,
            bus,
        })
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the declared state.
    pub fn state(&self) -> TaskState {
        self.state_mut().clone()
    }

    /// Returns `true` once the task reached a terminal transition.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Arranges the initial self-offer after the submitted delay.
    pub(crate) fn schedule(self: &Arc<Self>) {
        let delay = self.state_mut().delay;
        self.schedule_after(delay);
    }

    /// Re-offers the task to the dispatch-request channel without delay.
    ///
    /// Used by the dispatcher when a shutdown interrupts a handoff, so the
    /// claimed task is dispatched after resume instead of being lost.
    pub(crate) fn offer(self: &Arc<Self>) {
        self.schedule_after(Duration::ZERO);
    }

    /// Spawns the timer that offers this task to the dispatcher after `delay`.
    ///
    /// The spawned future exits early if the handle is cancelled, either
    /// while sleeping or while waiting for channel capacity.
    fn schedule_after(self: &Arc<Self>, delay: Duration) {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = me.cancel.cancelled() => return,
                    _ = time::sleep(delay) => {}
                }
            }
            tokio::select! {
                _ = me.cancel.cancelled() => {}
                res = me.fire.send(Arc::clone(&me)) => {
                    // A closed channel means the queue itself is gone.
                    let _ = res;
                }
            }
        });
    }

    /// Performs one execution attempt; called from a worker slot.
    ///
    /// Synchronous from the slot's perspective: the slot is occupied until
    /// the attempt returns. Terminal outcomes fire the completion callback
    /// exactly once; retryable failures re-enter the schedule path.
    pub(crate) async fn attempt(self: &Arc<Self>) {
        if self.is_done() || self.cancel.is_cancelled() {
            return;
        }

        let attempt = {
            let mut st = self.state_mut();
            st.dispatch_count += 1;
            st.dispatch_count
        };
        self.bus.publish(
            Event::now(EventKind::TaskDispatched)
                .with_task(self.name.clone())
                .with_attempt(attempt),
        );

        match self.runner.attempt(self.cancel.child_token()).await {
            Ok(()) => self.complete(TaskStatus::Succeeded, None),
            Err(err) => {
                let reason = err.to_string();
                if err.is_retryable() && !self.retry.attempts_exhausted(attempt) {
                    let delay = self.retry.delay_for(attempt);
                    self.state_mut().last_error = Some(reason.clone());
                    self.bus.publish(
                        Event::now(EventKind::RetryScheduled)
                            .with_task(self.name.clone())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(reason),
                    );
                    self.schedule_after(delay);
                } else {
                    self.complete(TaskStatus::Failed, Some(reason));
                }
            }
        }
    }

    /// Deletes the task, preventing any future firing.
    ///
    /// Safe to call before or after the task fired, and idempotent. A
    /// deleted task never invokes the completion callback.
    pub fn delete(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        self.state_mut().status = TaskStatus::Deleted;
        self.bus
            .publish(Event::now(EventKind::TaskDeleted).with_task(self.name.clone()));
    }

    /// Terminal transition: records the outcome and fires the completion
    /// callback. No-op if the task already completed or was deleted.
    fn complete(&self, status: TaskStatus, last_error: Option<String>) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        let snapshot = {
            let mut st = self.state_mut();
            st.status = status;
            if last_error.is_some() {
                st.last_error = last_error;
            }
            st.clone()
        };

        let kind = match status {
            TaskStatus::Succeeded => EventKind::TaskSucceeded,
            _ => EventKind::TaskFailed,
        };
        let mut ev = Event::now(kind)
            .with_task(self.name.clone())
            .with_attempt(snapshot.dispatch_count);
        if let Some(reason) = snapshot.last_error.as_deref() {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);

        (self.on_done)(&snapshot);
    }

    /// Locks the declared state, recovering from a poisoned lock.
    fn state_mut(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::task::TaskFn;
    use std::sync::atomic::AtomicU32;

    fn test_handle(
        runner: Arc<dyn Task>,
        retry: RetryPolicy,
    ) -> (TaskRef, mpsc::Receiver<TaskRef>, Arc<AtomicU32>) {
        let (fire_tx, fire_rx) = mpsc::channel(1);
        let done_count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&done_count);
        let on_done: DoneCallback = Arc::new(move |_st: &TaskState| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let handle = TaskHandle::new(
            TaskState::new("t"),
            runner,
            fire_tx,
            retry,
            Bus::new(16),
            on_done,
        );
        (handle, fire_rx, done_count)
    }

    #[tokio::test]
    async fn test_completion_callback_fires_once() {
        let runner = TaskFn::arc(|_ctx: CancellationToken| async { Ok::<_, TaskError>(()) });
        let (handle, _fire_rx, done_count) = test_handle(runner, RetryPolicy::default());

        handle.attempt().await;
        handle.attempt().await; // second attempt is a no-op on a done task

        assert_eq!(done_count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().status, TaskStatus::Succeeded);
        assert_eq!(handle.state().dispatch_count, 1);
    }

    #[tokio::test]
    async fn test_delete_suppresses_completion() {
        let runner = TaskFn::arc(|_ctx: CancellationToken| async { Ok::<_, TaskError>(()) });
        let (handle, _fire_rx, done_count) = test_handle(runner, RetryPolicy::default());

        handle.delete();
        handle.delete(); // idempotent
        handle.attempt().await;

        assert_eq!(done_count.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state().status, TaskStatus::Deleted);
        assert_eq!(handle.state().dispatch_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_pending_schedule() {
        let runner = TaskFn::arc(|_ctx: CancellationToken| async { Ok::<_, TaskError>(()) });
        let (handle, mut fire_rx, _done) = test_handle(runner, RetryPolicy::default());

        let delayed = TaskHandle::new(
            TaskState::new("later").with_delay(Duration::from_secs(5)),
            TaskFn::arc(|_ctx: CancellationToken| async { Ok::<_, TaskError>(()) }),
            handle.fire.clone(),
            RetryPolicy::default(),
            Bus::new(16),
            Arc::new(|_st: &TaskState| {}),
        );
        delayed.schedule();
        delayed.delete();

        time::sleep(Duration::from_secs(10)).await;
        assert!(fire_rx.try_recv().is_err(), "deleted task must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_reoffers_then_exhausts() {
        let runner = TaskFn::arc(|_ctx: CancellationToken| async { Err::<(), _>(TaskError::fail("boom")) });
        let retry = RetryPolicy {
            max_attempts: 2,
            max_doublings: 16,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        let (handle, mut fire_rx, done_count) = test_handle(runner, retry);

        handle.attempt().await;
        assert_eq!(done_count.load(Ordering::SeqCst), 0, "first failure retries");

        // The retry timer re-offers the task on the fire channel.
        let reoffered = fire_rx.recv().await.expect("retry offer");
        assert_eq!(reoffered.name(), "t");

        reoffered.attempt().await;
        assert_eq!(done_count.load(Ordering::SeqCst), 1, "budget of 2 exhausted");
        let state = handle.state();
        assert_eq!(state.status, TaskStatus::Failed);
        assert_eq!(state.dispatch_count, 2);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_fatal_failure_is_terminal() {
        let runner = TaskFn::arc(|_ctx: CancellationToken| async { Err::<(), _>(TaskError::fatal("bad payload")) });
        let (handle, _fire_rx, done_count) = test_handle(runner, RetryPolicy::default());

        handle.attempt().await;

        assert_eq!(done_count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().status, TaskStatus::Failed);
    }
}
