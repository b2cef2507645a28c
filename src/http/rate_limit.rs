//! Request pacing
//!
//! Two independent knobs:
//! - [`RateLimiter`]: governor token bucket capping requests per second
//! - [`Pacer`]: a fixed (optionally jittered) pause after each request

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_size: 1,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

/// Polite delay inserted between consecutive requests
///
/// The pause is `delay + uniform(0..=jitter)`. A zero pacer never sleeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
    jitter: Duration,
}

impl Pacer {
    /// Create a pacer with a fixed delay and a random jitter on top
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    /// Create a pacer with a fixed delay
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, Duration::ZERO)
    }

    /// A pacer that never sleeps
    pub fn none() -> Self {
        Self::default()
    }

    /// Base delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Maximum jitter
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Check if this pacer ever sleeps
    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero() || !self.jitter.is_zero()
    }

    /// Scale both delay and jitter, e.g. `0.25` for the pause between schemes
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        Self {
            delay: self.delay.mul_f64(factor),
            jitter: self.jitter.mul_f64(factor),
        }
    }

    /// Pick the next pause duration
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.delay + Duration::from_millis(extra)
    }

    /// Sleep for the next pause duration
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
