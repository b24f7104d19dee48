//! # Queue: lifecycle controller for the dispatch engine.
//!
//! The [`Queue`] owns the token bucket, the dispatch channels, the task
//! registry, and the cancellation tokens of its three loop families
//! (token generator, dispatcher, worker slots). `run`, `pause`, `resume`,
//! `delete`, and `purge` are the only mutating entry points into engine
//! state.
//!
//! ## High-level architecture
//! ```text
//! submit_task(state, task)
//!     └─► TaskHandle ──register──► TaskRegistry
//!              └─► schedule(): sleep(delay) ──► fire channel
//!
//! TokenGenerator ──mint──► TokenBucket
//!                              │ take
//!                              ▼
//! fire channel ──claim──► Dispatcher ──handoff──► work channel
//!                                                     │
//!                      WorkerPool slot ◄──────────────┘
//!                              └─► TaskHandle::attempt()
//!                                     ├─ Ok/terminal ─► on_done ─► registry
//!                                     │                 removal + owner callback
//!                                     └─ retryable ──► schedule(retry delay)
//!
//! Cancellation tokens:
//!   generator_cancel — queue lifetime, cancelled only by delete()
//!   cycle_cancel     — one per run cycle; pause() cancels it, resume()
//!                      installs a fresh one before restarting loops
//! ```
//!
//! ## Rules
//! - `cancelled` is terminal: no loop restarts after `delete()`.
//! - The generator outlives pause, so permits keep accumulating up to the
//!   burst cap while a queue is paused.
//! - Lifecycle misuse (double pause, resume while running, double delete)
//!   is a no-op, never an error.
//! - Lifecycle operations expect single-writer discipline from the caller;
//!   the atomic flags only make misuse harmless, not concurrent mutation
//!   meaningful.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ConfigOverrides, QueueConfig, QueueOptions};
use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::queue::dispatch::Dispatcher;
use crate::queue::registry::TaskRegistry;
use crate::queue::tokens::{TokenBucket, TokenGenerator};
use crate::queue::workers::WorkerPool;
use crate::tasks::{DoneCallback, Task, TaskHandle, TaskRef, TaskState};

/// Capacity of the queue's event bus ring buffer.
const BUS_CAPACITY: usize = 1024;

/// Declared lifecycle state of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    /// Dispatching; all three loop families are live.
    Running,
    /// Dispatcher and workers stopped; tokens keep minting.
    Paused,
    /// Terminal; all loops stopped and tasks purged.
    Deleted,
}

/// A named task queue dispatching at a bounded rate.
///
/// Construct with [`Queue::new`], then call [`Queue::run`] exactly once to
/// start the background loops. Dropping the queue after `delete()` tears
/// everything down; dropping without `delete()` leaves loops running until
/// their channels close.
pub struct Queue {
    name: Arc<str>,
    config: QueueConfig,
    bus: Bus,
    registry: Arc<TaskRegistry>,
    bucket: Arc<TokenBucket>,

    /// Dispatch-request channel: tasks offer themselves here when ready.
    fire_tx: mpsc::Sender<TaskRef>,
    fire_rx: Arc<Mutex<mpsc::Receiver<TaskRef>>>,
    /// Work handoff channel: dispatcher → worker slots.
    work_tx: mpsc::Sender<TaskRef>,
    work_rx: Arc<Mutex<mpsc::Receiver<TaskRef>>>,

    /// Owner's completion callback, forwarded after registry removal.
    on_task_done: DoneCallback,

    paused: AtomicBool,
    cancelled: AtomicBool,
    declared: StdMutex<QueueState>,

    /// Cancels the token generator; lives for the queue's lifetime.
    generator_cancel: CancellationToken,
    /// Cancels the dispatcher and worker slots of the current run cycle.
    /// Replaced with a fresh token on every resume.
    cycle_cancel: StdMutex<CancellationToken>,
}

impl Queue {
    /// Creates a queue with its configuration resolved from `options`,
    /// `overrides`, and the hard defaults, in that priority order.
    ///
    /// Returns the queue handle and the resolved configuration. The queue
    /// starts in the `Running` declared state but dispatches nothing until
    /// [`Queue::run`] is called.
    pub fn new(
        name: impl Into<Arc<str>>,
        options: QueueOptions,
        overrides: &ConfigOverrides,
        on_task_done: impl Fn(&TaskState) + Send + Sync + 'static,
    ) -> (Arc<Self>, QueueConfig) {
        let config = QueueConfig::resolve(&options, overrides);

        let (fire_tx, fire_rx) = mpsc::channel(1);
        let (work_tx, work_rx) = mpsc::channel(1);

        let queue = Arc::new(Self {
            name: name.into(),
            config,
            bus: Bus::new(BUS_CAPACITY),
            registry: TaskRegistry::new(),
            bucket: Arc::new(TokenBucket::new(config.rate.max_burst_size)),
            fire_tx,
            fire_rx: Arc::new(Mutex::new(fire_rx)),
            work_tx,
            work_rx: Arc::new(Mutex::new(work_rx)),
            on_task_done: Arc::new(on_task_done),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            declared: StdMutex::new(QueueState::Running),
            generator_cancel: CancellationToken::new(),
            cycle_cancel: StdMutex::new(CancellationToken::new()),
        });

        (queue, config)
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Returns the declared lifecycle state.
    pub fn state(&self) -> QueueState {
        *self.declared()
    }

    /// Returns the event bus for subscription.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Number of live tasks currently registered.
    ///
    /// Purge and completion are asynchronous; poll this rather than assuming
    /// they land synchronously.
    pub fn live_tasks(&self) -> usize {
        self.registry.live_count()
    }

    /// Number of dispatch permits currently in the token bucket.
    ///
    /// Starts at `max_burst_size` and never exceeds it.
    pub fn tokens_available(&self) -> usize {
        self.bucket.available()
    }

    /// Starts the token generator, the dispatcher, and the worker pool.
    ///
    /// Call exactly once after construction. Calling twice double-starts
    /// the loops; this is not guarded.
    pub fn run(&self) {
        let generator = TokenGenerator::new(&self.bucket, self.config.rate.mint_period());
        tokio::spawn(generator.run(self.generator_cancel.clone()));

        let cycle = self.cycle_cancel().clone();
        self.start_cycle(&cycle);
        debug!(queue = %self.name, "queue running");
    }

    /// Registers a task, clones its declared state for the caller, and
    /// schedules it so its timer eventually offers it to the dispatcher.
    ///
    /// The returned state is a registration-time snapshot; later internal
    /// mutation never aliases it. On terminal completion the queue removes
    /// the task from the registry and forwards the snapshot to the owner's
    /// completion callback.
    pub fn submit_task(
        self: &Arc<Self>,
        state: TaskState,
        task: Arc<dyn Task>,
    ) -> Result<(TaskRef, TaskState), QueueError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(QueueError::Deleted);
        }

        let registry = Arc::clone(&self.registry);
        let owner = Arc::clone(&self.on_task_done);
        let on_done: DoneCallback = Arc::new(move |snapshot: &TaskState| {
            registry.remove(&snapshot.name);
            owner(snapshot);
        });

        let handle = TaskHandle::new(
            state,
            task,
            self.fire_tx.clone(),
            self.config.retry,
            self.bus.clone(),
            on_done,
        );
        if !self.registry.insert(Arc::clone(&handle)) {
            return Err(QueueError::DuplicateTask {
                name: handle.name().to_string(),
            });
        }
        if self.cancelled.load(Ordering::SeqCst) {
            // Lost the race against delete(); withdraw the registration.
            handle.delete();
            self.registry.remove(handle.name());
            return Err(QueueError::Deleted);
        }

        let snapshot = handle.state();
        self.bus
            .publish(Event::now(EventKind::TaskSubmitted).with_task(handle.name()));
        handle.schedule();

        Ok((handle, snapshot))
    }

    /// Looks up a live task by name.
    pub fn task(&self, name: &str) -> Option<TaskRef> {
        self.registry.get(name)
    }

    /// Deletes a single task by name and tombstones its registry entry.
    ///
    /// Returns `false` if no live task holds the name.
    pub fn delete_task(&self, name: &str) -> bool {
        match self.registry.get(name) {
            Some(task) => {
                task.delete();
                self.registry.remove(name);
                true
            }
            None => false,
        }
    }

    /// Pauses dispatching. No-op if already paused or deleted.
    ///
    /// In-flight attempts finish normally; queued tasks stay un-dispatched
    /// until [`Queue::resume`]. The token generator keeps minting, so
    /// permits accumulate up to the burst cap while paused.
    pub fn pause(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if self.paused.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.declared() = QueueState::Paused;
        self.cycle_cancel().cancel();

        info!(queue = %self.name, "queue paused");
        self.bus
            .publish(Event::now(EventKind::QueuePaused).with_queue(self.name.clone()));
    }

    /// Resumes a paused queue. No-op if not paused or deleted.
    ///
    /// Installs a fresh cancellation token for the new cycle before
    /// restarting the dispatcher and workers, so a consumed token is never
    /// reused.
    pub fn resume(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if !self.paused.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.declared() = QueueState::Running;

        let fresh = CancellationToken::new();
        *self.cycle_cancel() = fresh.clone();
        self.start_cycle(&fresh);

        info!(queue = %self.name, "queue resumed");
        self.bus
            .publish(Event::now(EventKind::QueueResumed).with_queue(self.name.clone()));
    }

    /// Stops all loops and purges every registered task. Idempotent;
    /// `cancelled` is terminal and no loop restarts afterwards.
    pub fn delete(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.declared() = QueueState::Deleted;

        info!(queue = %self.name, "stopping queue");
        self.generator_cancel.cancel();
        self.cycle_cancel().cancel();
        self.registry.purge();

        self.bus
            .publish(Event::now(EventKind::QueueDeleted).with_queue(self.name.clone()));
    }

    /// Deletes all registered tasks without altering run/pause state.
    ///
    /// Fire-and-forget: returns before the sweep completes.
    pub fn purge(&self) {
        self.registry.purge();
        self.bus
            .publish(Event::now(EventKind::QueuePurged).with_queue(self.name.clone()));
    }

    /// Spawns the dispatcher and worker slots for one run cycle.
    fn start_cycle(&self, cancel: &CancellationToken) {
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.bucket),
            Arc::clone(&self.fire_rx),
            self.work_tx.clone(),
        );
        tokio::spawn(dispatcher.run(cancel.clone()));

        let pool = WorkerPool::new(
            Arc::clone(&self.work_rx),
            self.config.rate.max_concurrent_dispatches,
        );
        pool.spawn(cancel);
    }

    fn declared(&self) -> MutexGuard<'_, QueueState> {
        self.declared.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cycle_cancel(&self) -> MutexGuard<'_, CancellationToken> {
        self.cycle_cancel.lock().unwrap_or_else(|e| e.into_inner())
    }
}
