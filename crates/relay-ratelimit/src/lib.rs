//! Sliding-window rate limiter, keyed by client (first `X-Forwarded-For`
//! address, else peer address).

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
const SWEEP_IDLE_AFTER: Duration = Duration::from_secs(5 * 60);
const SWEEP_INTERVAL: Duration = SWEEP_IDLE_AFTER;

pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch-ms reset time, RFC3339-formattable by the HTTP layer.
    pub reset_at_ms: u64,
    pub retry_after_s: Option<u64>,
}

struct Bucket {
    timestamps: Vec<Instant>,
    last_touched: Instant,
}

pub struct RateLimiter {
    limit: u32,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            buckets: DashMap::new(),
        }
    }

    /// Checks and records one request for `client_key`. Trims the bucket to
    /// the last 60s; rejects once `limit` requests remain in that window.
    pub fn check(&self, client_key: &str, now_epoch_ms: u64) -> RateLimitDecision {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(client_key.to_string())
            .or_insert_with(|| Bucket {
                timestamps: Vec::new(),
                last_touched: now,
            });

        bucket.timestamps.retain(|&t| now.duration_since(t) <= WINDOW);
        bucket.last_touched = now;

        if bucket.timestamps.len() as u32 >= self.limit {
            let oldest = bucket.timestamps.first().copied().unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let retry_after_s = WINDOW.saturating_sub(elapsed).as_secs().max(1);
            let reset_at_ms = now_epoch_ms + retry_after_s * 1000;
            return RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_at_ms,
                retry_after_s: Some(retry_after_s),
            };
        }

        bucket.timestamps.push(now);
        let remaining = self.limit - bucket.timestamps.len() as u32;
        RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining,
            reset_at_ms: now_epoch_ms + WINDOW.as_millis() as u64,
            retry_after_s: None,
        }
    }

    /// Drops buckets with no requests in the window that haven't been
    /// touched in over 5 minutes. Intended to run on a periodic background
    /// task, not per-request.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.buckets.retain(|_, bucket| {
            let has_recent = bucket.timestamps.iter().any(|&t| now.duration_since(t) <= WINDOW);
            has_recent || now.duration_since(bucket.last_touched) <= SWEEP_IDLE_AFTER
        });
    }

    /// Spawns the periodic idle-bucket sweep, running every 5 minutes for as
    /// long as the returned handle is not dropped/aborted.
    pub fn spawn_sweep_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3);
        for i in 0..3 {
            let decision = limiter.check("client-a", 0);
            assert!(decision.allowed, "request {i} should be allowed");
        }
        let rejected = limiter.check("client-a", 0);
        assert!(!rejected.allowed);
        assert!(rejected.retry_after_s.unwrap_or(0) >= 1);
    }

    #[test]
    fn separate_clients_have_separate_buckets() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("client-a", 0).allowed);
        assert!(limiter.check("client-b", 0).allowed);
        assert!(!limiter.check("client-a", 0).allowed);
    }

    #[test]
    fn remaining_decreases_monotonically() {
        let limiter = RateLimiter::new(5);
        let mut previous = u32::MAX;
        for _ in 0..5 {
            let decision = limiter.check("client-a", 0);
            assert!(decision.remaining < previous);
            previous = decision.remaining;
        }
    }
}
