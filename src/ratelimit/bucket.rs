//! Token bucket state for a single client key.

use std::time::Duration;
use tokio::time::Instant;

/// Admission state for one client key.
///
/// Tokens refill continuously at `refill_rate` per second up to `capacity`,
/// and each admitted request consumes one token. Callers must serialize
/// access to an instance; the registry wraps each bucket in its own mutex.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens held (burst size), fixed at creation.
    capacity: u32,
    /// Tokens added per second, fixed at creation.
    refill_rate: f64,
    /// Current token count, always within `0.0..=capacity`.
    tokens: f64,
    /// When the last refill was computed. Updated on every `allow` call,
    /// so it doubles as the bucket's last-touch stamp for idle eviction.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket starting at full capacity.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    /// Refill based on elapsed time, then try to consume one token.
    ///
    /// Returns `true` if the request is admitted. This operation is total:
    /// denial is a normal outcome, never an error.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// How long this bucket has gone untouched.
    pub fn idle_for(&self) -> Duration {
        self.last_refill.elapsed()
    }

    /// Current token count.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Burst capacity this bucket was created with.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
