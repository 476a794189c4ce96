//! Per-client token bucket for the HTTP layer

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant, capacity: f64, refill_per_sec: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_refill = now;
    }
}

#[derive(Debug)]
struct Buckets {
    by_client: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
    capacity: u32,
    refill_per_sec: f64,
    sweep_interval: Duration,
}

impl RateLimiter {
    /// `requests` per `window`, refilled continuously
    pub fn new(requests: u32, window: Duration) -> Self {
        let capacity = requests.max(1);
        Self {
            buckets: Mutex::new(Buckets {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            capacity,
            refill_per_sec: capacity as f64 / window.as_secs_f64().max(f64::EPSILON),
            sweep_interval: window,
        }
    }

    pub fn try_acquire(&self, client: &str) -> RateLimitDecision {
        self.try_acquire_at(client, Instant::now())
    }

    fn try_acquire_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        let capacity = self.capacity as f64;
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        // A full bucket is indistinguishable from a new one
        if now.saturating_duration_since(buckets.last_sweep) >= self.sweep_interval {
            buckets.by_client.retain(|_, bucket| {
                bucket.refill(now, capacity, self.refill_per_sec);
                bucket.tokens < capacity
            });
            buckets.last_sweep = now;
        }

        let bucket = buckets.by_client.entry(client.to_string()).or_insert_with(|| TokenBucket {
            tokens: capacity,
            last_refill: now,
        });
        bucket.refill(now, capacity, self.refill_per_sec);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision::Allowed { remaining: bucket.tokens as u32 }
        } else {
            let needed = 1.0 - bucket.tokens;
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs_f64(needed / self.refill_per_sec),
            }
        }
    }
}
