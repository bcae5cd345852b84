//! Per-org token-bucket rate limiting (spec §4.2 step 4, §5).
//!
//! Shaped like the teacher's `RateLimitTracker` (`scheduler/rate_limits.rs`):
//! a `Mutex`-guarded map keyed by identifier, one bucket per key, lazily
//! created on first use. The teacher tracks a sliding window; Nerve needs a
//! token bucket (capacity + steady refill derived from `mcp_rpm`), so the
//! per-bucket algorithm is new but the map/eviction shape is the same.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
    last_used: Instant,
}

impl TokenBucket {
    fn new(rpm: u32, now: Instant) -> Self {
        let capacity = rpm.max(1) as f64;
        Self { capacity, tokens: capacity, refill_per_sec: capacity / 60.0, last_refill: now, last_used: now }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Attempts to take one token. Returns `Ok(())` or `Err(retry_after)`.
    fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        self.last_used = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            let wait_secs = deficit / self.refill_per_sec;
            Err(Duration::from_secs_f64(wait_secs.max(0.0)))
        }
    }
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<Uuid, TokenBucket>>,
    idle_ttl: Duration,
}

impl RateLimiter {
    pub fn new(idle_ttl: Duration) -> Self {
        Self { buckets: Mutex::new(HashMap::new()), idle_ttl }
    }

    /// Attempts to consume one token from `org_id`'s bucket, sized for
    /// `mcp_rpm` tokens per 60-second window. Also evicts buckets idle past
    /// `idle_ttl` to bound memory (spec §5).
    pub async fn check(&self, org_id: Uuid, mcp_rpm: u32) -> Result<(), u64> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        buckets.retain(|_, b| now.saturating_duration_since(b.last_used) < self.idle_ttl);
        let bucket = buckets.entry(org_id).or_insert_with(|| TokenBucket::new(mcp_rpm, now));
        bucket.try_take(now).map_err(|d| d.as_secs().max(1))
    }

    #[cfg(test)]
    async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_up_to_capacity_then_limits() {
        let limiter = RateLimiter::new(Duration::from_secs(600));
        let org = Uuid::new_v4();
        for _ in 0..5 {
            assert!(limiter.check(org, 5).await.is_ok());
        }
        assert!(limiter.check(org, 5).await.is_err());
    }

    #[tokio::test]
    async fn distinct_orgs_get_distinct_buckets() {
        let limiter = RateLimiter::new(Duration::from_secs(600));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for _ in 0..3 {
            limiter.check(a, 3).await.ok();
        }
        assert!(limiter.check(a, 3).await.is_err());
        assert!(limiter.check(b, 3).await.is_ok());
        assert_eq!(limiter.bucket_count().await, 2);
    }
}
