//! # Dispatcher: pairs rate permits with ready tasks.
//!
//! One dispatcher instance runs per queue run cycle. It repeatedly:
//! 1. takes a permit from the token bucket,
//! 2. claims the next ready task from the dispatch-request channel,
//! 3. hands the task to the worker pool.
//!
//! ## Rules
//! - One permit is spent per task admitted to execution; a permit is never
//!   consumed without a handoff except when shutdown interrupts the pairing,
//!   in which case the permit is discarded (the queue is stopping anyway).
//! - Cancellation is observable at every wait: permit, task claim, handoff.
//! - If shutdown interrupts the handoff itself, the claimed task is
//!   re-offered to the dispatch-request channel so it is dispatched after a
//!   later resume instead of being lost.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::queue::tokens::TokenBucket;
use crate::tasks::TaskRef;

/// Background loop gating task execution through the token bucket.
pub(crate) struct Dispatcher {
    bucket: Arc<TokenBucket>,
    fire: Arc<Mutex<mpsc::Receiver<TaskRef>>>,
    work: mpsc::Sender<TaskRef>,
}

impl Dispatcher {
    pub(crate) fn new(
        bucket: Arc<TokenBucket>,
        fire: Arc<Mutex<mpsc::Receiver<TaskRef>>>,
        work: mpsc::Sender<TaskRef>,
    ) -> Self {
        Self { bucket, fire, work }
    }

    /// Runs until cancelled or the queue's channels close.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        loop {
            // Consume a token.
            if !self.bucket.take(&cancel).await {
                return;
            }

            // Wait for a ready task.
            let task = {
                let mut fire = self.fire.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    task = fire.recv() => task,
                }
            };
            let Some(task) = task else { return };

            // Pass on to the workers.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    task.offer();
                    return;
                }
                slot = self.work.reserve() => match slot {
                    Ok(permit) => permit.send(task),
                    Err(_) => {
                        task.offer();
                        return;
                    }
                },
            }
        }
    }
}
