//! # Worker pool: bounded set of concurrent execution slots.
//!
//! Exactly `max_concurrent_dispatches` slots run while the queue is in a
//! running cycle. Each slot loops: receive a dispatched task, await its
//! attempt. The slot is occupied for the whole attempt, which is the
//! concurrency-limiting contract.
//!
//! ## Rules
//! - All slots share one work receiver; a short mutex serializes the receive
//!   itself, never the attempt, so up to N attempts run concurrently.
//! - All slots observe one shared cancellation token and stop exactly once
//!   per cancellation event.
//! - Cancellation never aborts an in-flight attempt; a slot checks the token
//!   only between tasks.
//! - The receive select is biased toward cancellation, so a stopping slot
//!   never claims another buffered task; buffered work waits for the next
//!   run cycle.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::tasks::TaskRef;

/// Spawner for a queue's worker slots.
pub(crate) struct WorkerPool {
    work: Arc<Mutex<mpsc::Receiver<TaskRef>>>,
    slots: usize,
}

impl WorkerPool {
    pub(crate) fn new(work: Arc<Mutex<mpsc::Receiver<TaskRef>>>, slots: usize) -> Self {
        Self {
            work,
            slots: slots.max(1),
        }
    }

    /// Spawns all slots for one run cycle.
    pub(crate) fn spawn(&self, cancel: &CancellationToken) {
        for _ in 0..self.slots {
            let work = Arc::clone(&self.work);
            let cancel = cancel.clone();
            tokio::spawn(run_slot(work, cancel));
        }
    }
}

/// One execution slot: receive → attempt, until cancelled.
async fn run_slot(work: Arc<Mutex<mpsc::Receiver<TaskRef>>>, cancel: CancellationToken) {
    loop {
        let task = {
            let mut rx = work.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                task = rx.recv() => task,
            }
        };
        match task {
            Some(task) => task.attempt().await,
            None => return,
        }
    }
}
