//! # Queue configuration and resolution.
//!
//! Provides [`RateLimits`] and [`QueueConfig`], plus the two partial inputs
//! they are resolved from at construction time:
//!
//! 1. **Caller-supplied values**: [`QueueOptions`] (highest priority)
//! 2. **External overrides**: [`ConfigOverrides`] (e.g. parsed from the
//!    process environment by [`ConfigOverrides::from_env`])
//! 3. **Hard defaults** (lowest priority)
//!
//! Resolution happens exactly once, in [`QueueConfig::resolve`], before any
//! background loop starts. Core logic never reads the environment itself;
//! callers that want environment-driven settings pass
//! `&ConfigOverrides::from_env()` explicitly.
//!
//! ## Sentinel values
//! Zero, negative, or unparsable values are ignored at every layer and fall
//! through to the next source. A queue can therefore never end up with a
//! non-positive dispatch rate or an empty worker pool.

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Rate limiting parameters for a queue.
///
/// ## Field semantics
/// - `max_dispatches_per_second`: steady-state token mint rate
/// - `max_burst_size`: token bucket capacity (the bucket starts full)
/// - `max_concurrent_dispatches`: number of worker slots
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimits {
    /// Steady-state dispatch rate (tokens minted per second).
    pub max_dispatches_per_second: f64,
    /// Token bucket capacity; also the size of the initial burst.
    pub max_burst_size: usize,
    /// Number of concurrent worker slots.
    pub max_concurrent_dispatches: usize,
}

impl Default for RateLimits {
    /// Default limits:
    /// - `max_dispatches_per_second = 500.0`
    /// - `max_burst_size = 100`
    /// - `max_concurrent_dispatches = 1000`
    fn default() -> Self {
        Self {
            max_dispatches_per_second: 500.0,
            max_burst_size: 100,
            max_concurrent_dispatches: 1000,
        }
    }
}

impl RateLimits {
    /// Returns the token mint period, `1s / max_dispatches_per_second`.
    ///
    /// The rate is validated positive during resolution, so the period is
    /// always finite and non-zero.
    #[inline]
    pub fn mint_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_dispatches_per_second)
    }
}

/// Fully resolved configuration for a queue.
///
/// Produced by [`QueueConfig::resolve`] and returned to the caller from
/// queue construction, so the owner sees exactly the values in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueueConfig {
    /// Rate limiting parameters.
    pub rate: RateLimits,
    /// Retry policy applied to every task on this queue.
    pub retry: RetryPolicy,
}

/// Caller-supplied partial configuration.
///
/// Every field is optional; `None` (or a zero/negative value) falls through
/// to the override source and then to the defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueueOptions {
    pub max_dispatches_per_second: Option<f64>,
    pub max_burst_size: Option<usize>,
    pub max_concurrent_dispatches: Option<usize>,
    pub max_attempts: Option<u32>,
    pub max_doublings: Option<u32>,
    pub min_backoff: Option<Duration>,
    pub max_backoff: Option<Duration>,
}

/// External configuration overrides, consulted after caller-supplied values.
///
/// Typically built once at process start via [`ConfigOverrides::from_env`]
/// and passed to every queue construction. An empty override set
/// ([`ConfigOverrides::default`]) leaves the defaults in charge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConfigOverrides {
    pub max_dispatches_per_second: Option<f64>,
    pub max_burst_size: Option<usize>,
    pub max_concurrent_dispatches: Option<usize>,
    pub max_attempts: Option<u32>,
    pub max_doublings: Option<u32>,
    pub min_backoff: Option<Duration>,
    pub max_backoff: Option<Duration>,
}

impl ConfigOverrides {
    /// Parses overrides from the process environment.
    ///
    /// Recognized variables:
    /// `MAX_DISPATCHES_PER_SECOND`, `MAX_BURST_SIZE`,
    /// `MAX_CONCURRENT_DISPATCHES`, `MAX_ATTEMPTS`, `MAX_DOUBLINGS`,
    /// `MIN_BACKOFF`, `MAX_BACKOFF`.
    ///
    /// Backoff values are in seconds (fractional allowed, so `0.25` is
    /// 250ms). A missing, unparsable, or non-positive variable is ignored.
    pub fn from_env() -> Self {
        Self {
            max_dispatches_per_second: env_f64("MAX_DISPATCHES_PER_SECOND"),
            max_burst_size: env_usize("MAX_BURST_SIZE"),
            max_concurrent_dispatches: env_usize("MAX_CONCURRENT_DISPATCHES"),
            max_attempts: env_u32("MAX_ATTEMPTS"),
            max_doublings: env_u32("MAX_DOUBLINGS"),
            min_backoff: env_secs("MIN_BACKOFF"),
            max_backoff: env_secs("MAX_BACKOFF"),
        }
    }
}

impl QueueConfig {
    /// Resolves a concrete configuration from caller options and overrides.
    ///
    /// Per field: caller value, else override, else default. Zero and
    /// negative values count as unset.
    pub fn resolve(options: &QueueOptions, overrides: &ConfigOverrides) -> Self {
        let rate_default = RateLimits::default();
        let retry_default = RetryPolicy::default();

        Self {
            rate: RateLimits {
                max_dispatches_per_second: pick_f64(
                    options.max_dispatches_per_second,
                    overrides.max_dispatches_per_second,
                    rate_default.max_dispatches_per_second,
                ),
                max_burst_size: pick_nonzero(
                    options.max_burst_size,
                    overrides.max_burst_size,
                    rate_default.max_burst_size,
                ),
                max_concurrent_dispatches: pick_nonzero(
                    options.max_concurrent_dispatches,
                    overrides.max_concurrent_dispatches,
                    rate_default.max_concurrent_dispatches,
                ),
            },
            retry: RetryPolicy {
                max_attempts: pick_nonzero(
                    options.max_attempts,
                    overrides.max_attempts,
                    retry_default.max_attempts,
                ),
                max_doublings: pick_nonzero(
                    options.max_doublings,
                    overrides.max_doublings,
                    retry_default.max_doublings,
                ),
                min_backoff: pick_duration(
                    options.min_backoff,
                    overrides.min_backoff,
                    retry_default.min_backoff,
                ),
                max_backoff: pick_duration(
                    options.max_backoff,
                    overrides.max_backoff,
                    retry_default.max_backoff,
                ),
            },
        }
    }
}

fn pick_f64(explicit: Option<f64>, fallback: Option<f64>, default: f64) -> f64 {
    let valid = |v: &f64| v.is_finite() && *v > 0.0;
    explicit
        .filter(valid)
        .or(fallback.filter(valid))
        .unwrap_or(default)
}

fn pick_nonzero<T: Copy + Default + PartialEq>(
    explicit: Option<T>,
    fallback: Option<T>,
    default: T,
) -> T {
    let valid = |v: &T| *v != T::default();
    explicit
        .filter(valid)
        .or(fallback.filter(valid))
        .unwrap_or(default)
}

fn pick_duration(
    explicit: Option<Duration>,
    fallback: Option<Duration>,
    default: Duration,
) -> Duration {
    let valid = |v: &Duration| !v.is_zero();
    explicit
        .filter(valid)
        .or(fallback.filter(valid))
        .unwrap_or(default)
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

fn env_secs(key: &str) -> Option<Duration> {
    env_f64(key).map(Duration::from_secs_f64)
}
