use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

impl Bucket {
    /// Credit tokens accrued since the last visit, capped at `burst`.
    fn refill(&mut self, now: Instant, per_sec: f64, burst: f64) {
        let elapsed = now.duration_since(self.last_seen).as_secs_f64();
        self.tokens = (self.tokens + elapsed * per_sec).min(burst);
        self.last_seen = now;
    }

    /// Spend one token, or report the wait until one accrues.
    fn take(&mut self, per_sec: f64) -> Result<(), Option<Duration>> {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        if per_sec <= 0.0 {
            return Err(None);
        }
        Err(Duration::try_from_secs_f64((1.0 - self.tokens) / per_sec).ok())
    }
}

/// Per-IP token bucket guarding the generate endpoint.
///
/// Each generation costs one remote model call, so clients get a small burst
/// and then a slow refill.
pub struct IpRateLimiter {
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
    burst: f64,
    per_sec: f64,
}

impl IpRateLimiter {
    pub fn new(burst: f64, per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            burst,
            per_sec,
        }
    }

    /// Take one token for `ip`. On refusal returns how long until the next
    /// token is available (`None` if the bucket never refills or the wait is
    /// not representable).
    pub async fn acquire(&self, ip: IpAddr) -> Result<(), Option<Duration>> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(ip).or_insert(Bucket {
            tokens: self.burst,
            last_seen: now,
        });
        bucket.refill(now, self.per_sec, self.burst);
        bucket.take(self.per_sec)
    }

    /// Forget clients not seen within `max_age`.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < max_age);
        before - buckets.len()
    }
}
