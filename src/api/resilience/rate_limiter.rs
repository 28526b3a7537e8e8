//! Token bucket rate limiter
//!
//! One limiter per client instance; every GraphQL request takes a token.
//! Bulk operations running items concurrently share the same bucket.

use super::config::RateLimitConfig;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Bucket>>,
    config: RateLimitConfig,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    granted: u64,
    delayed: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Bucket {
                tokens: config.burst_capacity as f64,
                last_refill: Instant::now(),
                granted: 0,
                delayed: 0,
            })),
            config,
        }
    }

    fn bucket(&self) -> MutexGuard<'_, Bucket> {
        // A panic while holding the lock leaves plain counters behind
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait until a token is available, then take it
    pub async fn acquire(&self) {
        if !self.config.enabled {
            return;
        }

        while !self.take_token() {
            let wait = self.token_interval();
            debug!("Rate limiter: waiting {:?} for next token", wait);
            sleep(wait).await;
        }
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        if !self.config.enabled {
            return true;
        }
        self.take_token()
    }

    fn take_token(&self) -> bool {
        let mut bucket = self.bucket();
        self.refill(&mut bucket);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            bucket.granted += 1;
            true
        } else {
            bucket.delayed += 1;
            false
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        let bucket = self.bucket();
        RateLimiterStats {
            tokens_available: bucket.tokens,
            requests_granted: bucket.granted,
            requests_delayed: bucket.delayed,
            enabled: self.config.enabled,
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        let per_second = self.config.requests_per_minute as f64 / 60.0;
        let added = elapsed.as_secs_f64() * per_second;

        if added > 0.0 {
            bucket.tokens = (bucket.tokens + added).min(self.config.burst_capacity as f64);
            bucket.last_refill = now;
        }
    }

    fn token_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.config.requests_per_minute.max(1) as f64)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub tokens_available: f64,
    pub requests_granted: u64,
    /// Times a caller found the bucket empty
    pub requests_delayed: u64,
    pub enabled: bool,
}
