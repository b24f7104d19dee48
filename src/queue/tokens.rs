//! # Token bucket and rate token generator.
//!
//! The bucket is a bounded channel of permits: capacity is the configured
//! burst size and the bucket starts full, so a fresh queue can dispatch a
//! full burst immediately. The generator then mints one permit per
//! `1s / max_dispatches_per_second`, blocking on a full bucket (excess
//! permits are simply not produced).
//!
//! ## Rules
//! - Permits in flight never exceed the burst capacity: the channel bound is
//!   the invariant, no counter needed.
//! - The mint timer re-arms relative to the instant the previous permit was
//!   accepted, so a full bucket delays minting instead of accumulating a
//!   backlog of ticks to catch up on.
//! - Cancellation is observable both while sleeping and while waiting for
//!   bucket capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Bounded bucket of dispatch permits.
///
/// The single consumer is the queue's dispatcher; the single producer is the
/// [`TokenGenerator`]. Both sides survive pause/resume cycles, so the bucket
/// keeps filling while a queue is paused (up to the burst cap).
pub(crate) struct TokenBucket {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl TokenBucket {
    /// Creates a bucket with capacity `burst`, filled to the brim.
    pub(crate) fn new(burst: usize) -> Self {
        let burst = burst.max(1);
        let (tx, rx) = mpsc::channel(burst);
        for _ in 0..burst {
            // Cannot fail: the channel was just created with this capacity.
            let _ = tx.try_send(());
        }
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Returns a producer handle for the generator.
    pub(crate) fn minter(&self) -> mpsc::Sender<()> {
        self.tx.clone()
    }

    /// Number of permits currently available.
    pub(crate) fn available(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Takes one permit, waiting until one is minted.
    ///
    /// Returns `false` if `cancel` fires first; the dispatcher treats that
    /// as shutdown.
    pub(crate) async fn take(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            permit = rx.recv() => permit.is_some(),
        }
    }
}

/// Background loop minting permits at the configured rate.
pub(crate) struct TokenGenerator {
    bucket: mpsc::Sender<()>,
    period: Duration,
}

impl TokenGenerator {
    pub(crate) fn new(bucket: &Arc<TokenBucket>, period: Duration) -> Self {
        Self {
            bucket: bucket.minter(),
            period,
        }
    }

    /// Runs until cancelled. One permit per period; a full bucket stalls the
    /// loop until the dispatcher frees capacity.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = time::sleep(self.period) => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                slot = self.bucket.reserve() => match slot {
                    Ok(permit) => permit.send(()),
                    Err(_) => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_starts_full() {
        let bucket = TokenBucket::new(5);
        assert_eq!(bucket.available(), 5);
    }

    #[tokio::test]
    async fn test_bucket_never_exceeds_burst() {
        let bucket = TokenBucket::new(3);
        let minter = bucket.minter();
        // Full bucket rejects further permits.
        assert!(minter.try_send(()).is_err());
        assert_eq!(bucket.available(), 3);
    }

    #[tokio::test]
    async fn test_take_drains_and_cancel_interrupts() {
        let bucket = TokenBucket::new(2);
        let cancel = CancellationToken::new();

        assert!(bucket.take(&cancel).await);
        assert!(bucket.take(&cancel).await);
        assert_eq!(bucket.available(), 0);

        cancel.cancel();
        assert!(!bucket.take(&cancel).await, "empty bucket + cancel = false");
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_mints_one_permit_per_period() {
        let bucket = Arc::new(TokenBucket::new(10));
        let cancel = CancellationToken::new();
        // Drain the initial burst so minting is observable.
        for _ in 0..10 {
            assert!(bucket.take(&cancel).await);
        }

        let generator = TokenGenerator::new(&bucket, Duration::from_millis(100));
        tokio::spawn(generator.run(cancel.clone()));

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(bucket.available(), 1);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bucket.available(), 2);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_stalls_at_capacity() {
        let bucket = Arc::new(TokenBucket::new(1));
        let cancel = CancellationToken::new();

        let generator = TokenGenerator::new(&bucket, Duration::from_millis(10));
        tokio::spawn(generator.run(cancel.clone()));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(bucket.available(), 1, "bucket stays at its cap");

        cancel.cancel();
    }
}
