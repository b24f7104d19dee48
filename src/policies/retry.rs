//! # Retry policy for failed task attempts.
//!
//! [`RetryPolicy`] controls how many attempts a task gets and how retry
//! delays grow after repeated failures. It is parameterized by:
//! - [`RetryPolicy::max_attempts`] the total attempt budget (first included);
//! - [`RetryPolicy::max_doublings`] how many times the delay doubles;
//! - [`RetryPolicy::min_backoff`] the initial delay;
//! - [`RetryPolicy::max_backoff`] the maximum delay cap.
//!
//! The delay after attempt `n` (1-based) is
//! `min_backoff × 2^min(n−1, max_doublings)`, clamped to `max_backoff`.
//! The base delay derives purely from the attempt number, so delays are
//! reproducible and never feed back into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use paceq::RetryPolicy;
//!
//! let retry = RetryPolicy {
//!     max_attempts: 5,
//!     max_doublings: 3,
//!     min_backoff: Duration::from_millis(100),
//!     max_backoff: Duration::from_secs(10),
//! };
//!
//! // After the first attempt — min_backoff.
//! assert_eq!(retry.delay_for(1), Duration::from_millis(100));
//!
//! // After the second — one doubling.
//! assert_eq!(retry.delay_for(2), Duration::from_millis(200));
//!
//! // Doublings stop at max_doublings; the delay plateaus.
//! assert_eq!(retry.delay_for(4), Duration::from_millis(800));
//! assert_eq!(retry.delay_for(9), Duration::from_millis(800));
//! ```

use std::time::Duration;

/// Retry policy for a queue's tasks.
///
/// Encapsulates the attempt budget and the doubling-backoff parameters that
/// determine when a failed task re-enters the dispatch path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts a task may consume, including the first.
    pub max_attempts: u32,
    /// Number of times the retry delay doubles before plateauing.
    pub max_doublings: u32,
    /// Delay after the first failed attempt.
    pub min_backoff: Duration,
    /// Maximum delay cap for retries.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_attempts = 100`;
    /// - `max_doublings = 16`;
    /// - `min_backoff = 100ms`;
    /// - `max_backoff = 3600s`.
    fn default() -> Self {
        Self {
            max_attempts: 100,
            max_doublings: 16,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Returns `true` when `dispatch_count` attempts have used up the budget.
    #[inline]
    pub fn attempts_exhausted(&self, dispatch_count: u32) -> bool {
        dispatch_count >= self.max_attempts
    }

    /// Computes the delay before the attempt following attempt `n` (1-based).
    ///
    /// The base delay is `min_backoff × 2^min(n−1, max_doublings)`, clamped
    /// to [`RetryPolicy::max_backoff`]. Overflowing or non-finite
    /// intermediates clamp to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(self.max_doublings);
        let max_secs = self.max_backoff.as_secs_f64();
        let clamped_exp = doublings.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.min_backoff.as_secs_f64() * 2f64.powi(clamped_exp);

        if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
            self.max_backoff
        } else {
            Duration::from_secs_f64(unclamped_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_retry_uses_min_backoff() {
        let policy = RetryPolicy {
            max_attempts: 10,
            max_doublings: 16,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(3600),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    }

    #[test]
    fn test_doubling_growth() {
        let policy = RetryPolicy {
            max_attempts: 10,
            max_doublings: 16,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(3600),
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1600));
    }

    #[test]
    fn test_doublings_plateau() {
        let policy = RetryPolicy {
            max_attempts: 100,
            max_doublings: 3,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(3600),
        };
        // 2^3 = 8x is the ceiling once doublings are spent.
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        for attempt in 5..20 {
            assert_eq!(
                policy.delay_for(attempt),
                Duration::from_millis(800),
                "attempt {} should plateau at 800ms",
                attempt
            );
        }
    }

    #[test]
    fn test_clamped_to_max_backoff() {
        let policy = RetryPolicy {
            max_attempts: 100,
            max_doublings: 16,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
    }

    #[test]
    fn test_min_exceeds_max() {
        let policy = RetryPolicy {
            max_attempts: 100,
            max_doublings: 16,
            min_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_doublings_clamp_to_max() {
        let policy = RetryPolicy {
            max_attempts: u32::MAX,
            max_doublings: u32::MAX,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_attempts_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(!policy.attempts_exhausted(1));
        assert!(!policy.attempts_exhausted(2));
        assert!(policy.attempts_exhausted(3));
        assert!(policy.attempts_exhausted(4));
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 100);
        assert_eq!(policy.max_doublings, 16);
        assert_eq!(policy.min_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(3600));
    }
}
