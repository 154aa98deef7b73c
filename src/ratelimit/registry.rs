//! Per-client bucket registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::bucket::TokenBucket;

/// Shared handle to one client's bucket.
pub type SharedBucket = Arc<Mutex<TokenBucket>>;

/// Maps client key to its token bucket, creating buckets lazily.
///
/// This struct is thread-safe and shared across all request tasks. The map
/// lock covers only lookup and insertion; each bucket carries its own mutex,
/// so admission checks for unrelated keys never contend.
pub struct LimiterRegistry {
    /// Buckets indexed by client key.
    buckets: RwLock<HashMap<String, SharedBucket>>,
    /// Burst capacity applied to every new bucket.
    capacity: u32,
    /// Refill rate (tokens per second) applied to every new bucket.
    refill_rate: f64,
}

impl LimiterRegistry {
    /// Create a registry whose buckets all use the given capacity and rate.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            capacity,
            refill_rate,
        }
    }

    /// Return the bucket for `key`, creating it on first sight.
    ///
    /// For any key, exactly one bucket is ever created: racing first-time
    /// callers all land on the same instance. The read lock serves the common
    /// repeat-client path; on a miss the write lock is taken and `entry`
    /// re-checks existence before inserting, so a bucket created by a
    /// concurrent task is returned rather than replaced.
    pub fn get_or_create(&self, key: &str) -> SharedBucket {
        if let Some(bucket) = self.buckets.read().get(key) {
            trace!(key = %key, "Found existing bucket");
            return Arc::clone(bucket);
        }

        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| {
            debug!(
                key = %key,
                capacity = self.capacity,
                refill_rate = self.refill_rate,
                "Creating new token bucket"
            );
            Arc::new(Mutex::new(TokenBucket::new(self.capacity, self.refill_rate)))
        });
        Arc::clone(bucket)
    }

    /// Run an admission check for `key`.
    ///
    /// Returns `true` if the request is admitted. Never fails: an unseen key
    /// gets a fresh bucket at full capacity.
    pub fn check(&self, key: &str) -> bool {
        let bucket = self.get_or_create(key);
        let allowed = bucket.lock().allow();
        if !allowed {
            debug!(key = %key, "Rate limit exceeded");
        }
        allowed
    }

    /// Remove buckets that have been idle longer than `ttl`.
    ///
    /// Returns the number of buckets removed. A bucket mid-check is never
    /// removed out from under its caller: callers hold an `Arc`, so a swept
    /// bucket stays alive until the last in-flight reference drops.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let mut buckets = self.buckets.write();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.lock().idle_for() < ttl);
        let removed = before - buckets.len();

        if removed > 0 {
            debug!(removed = removed, remaining = buckets.len(), "Swept idle buckets");
        }
        removed
    }

    /// Number of tracked client keys.
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Drop all buckets.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.buckets.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = LimiterRegistry::new(10, 1.0);
        assert_eq!(registry.bucket_count(), 0);
    }

    #[tokio::test]
    async fn test_get_or_create_creates_once() {
        let registry = LimiterRegistry::new(10, 1.0);

        let first = registry.get_or_create("10.0.0.1");
        let second = registry.get_or_create("10.0.0.1");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.bucket_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_time_creation_yields_one_bucket() {
        const TASKS: usize = 32;

        let registry = Arc::new(LimiterRegistry::new(10, 1.0));
        let barrier = Arc::new(Barrier::new(TASKS));

        let mut handles = Vec::with_capacity(TASKS);
        for _ in 0..TASKS {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                registry.get_or_create("198.51.100.7")
            }));
        }

        let mut buckets = Vec::with_capacity(TASKS);
        for handle in handles {
            buckets.push(handle.await.unwrap());
        }

        // All callers must share the identical instance, not equal copies.
        for bucket in &buckets[1..] {
            assert!(Arc::ptr_eq(&buckets[0], bucket));
        }
        assert_eq!(registry.bucket_count(), 1);
    }

    #[tokio::test]
    async fn test_racing_creation_does_not_lose_consumed_tokens() {
        let registry = Arc::new(LimiterRegistry::new(2, 0.0));

        // Consume through one handle, then fetch again: the second fetch
        // must observe the consumption, not a replacement bucket.
        let bucket = registry.get_or_create("10.0.0.2");
        assert!(bucket.lock().allow());
        assert!(bucket.lock().allow());

        let again = registry.get_or_create("10.0.0.2");
        assert!(!again.lock().allow());
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let registry = LimiterRegistry::new(1, 0.0);

        assert!(registry.check("10.0.0.1"));
        assert!(!registry.check("10.0.0.1"));

        // Key B is untouched by key A's exhaustion.
        let b = registry.get_or_create("10.0.0.2");
        assert_eq!(b.lock().tokens(), 1.0);
        assert!(registry.check("10.0.0.2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_idle_keeps_active() {
        let registry = LimiterRegistry::new(5, 1.0);

        registry.check("10.0.0.1");
        registry.check("10.0.0.2");
        tokio::time::advance(Duration::from_secs(120)).await;

        // Touch one key so only the other is idle.
        registry.check("10.0.0.2");

        let removed = registry.sweep_idle(Duration::from_secs(60));
        assert_eq!(removed, 1);
        assert_eq!(registry.bucket_count(), 1);
        assert!(registry.check("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = LimiterRegistry::new(5, 1.0);

        registry.check("10.0.0.1");
        assert_eq!(registry.bucket_count(), 1);

        registry.clear();
        assert_eq!(registry.bucket_count(), 0);
    }
}
