use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::limits::{RATE_LIMIT_MUTE_AFTER, RATE_LIMIT_MUTE_DURATION_MS};

/// Token bucket: refills at `rate` tokens per second, capped at `burst`.
/// Refill is computed lazily from elapsed time on each consume attempt.
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    rate: f64,
    burst: f64,
}

impl TokenBucket {
    /// A fresh bucket starts full, so short spikes are allowed immediately.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            tokens: burst,
            last_refill: Instant::now(),
            rate,
            burst,
        }
    }

    /// Refill based on elapsed time, then consume `n` tokens if available.
    pub fn try_consume(&mut self, n: f64) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    fn try_consume_at(&mut self, n: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_refill = now;

        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> f64 {
        self.tokens
    }
}

/// Wraps a [`TokenBucket`] with violation counting: after
/// `RATE_LIMIT_MUTE_AFTER` consecutive rejected consumes, the caller is
/// muted for `RATE_LIMIT_MUTE_DURATION_MS`. While muted, `try_consume`
/// rejects without consulting the bucket.
#[derive(Debug)]
pub struct MutingLimiter {
    bucket: TokenBucket,
    violations: u32,
    muted_until: Option<Instant>,
}

impl MutingLimiter {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            bucket: TokenBucket::new(rate, burst),
            violations: 0,
            muted_until: None,
        }
    }

    pub fn try_consume(&mut self, n: f64) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    fn try_consume_at(&mut self, n: f64, now: Instant) -> bool {
        if let Some(until) = self.muted_until {
            if now < until {
                return false;
            }
            // Mute expired; start over with a clean slate.
            self.muted_until = None;
            self.violations = 0;
        }

        if self.bucket.try_consume_at(n, now) {
            self.violations = 0;
            return true;
        }

        self.violations += 1;
        if self.violations >= RATE_LIMIT_MUTE_AFTER {
            self.muted_until = Some(now + Duration::from_millis(RATE_LIMIT_MUTE_DURATION_MS));
            self.violations = 0;
        }
        false
    }

    pub fn is_muted(&self) -> bool {
        matches!(self.muted_until, Some(until) if Instant::now() < until)
    }
}

/// Per-user cursor rate limiting. One [`MutingLimiter`] per
/// `room_id:user_id` key; buckets for independent users never interact.
pub struct CursorLimiter {
    buckets: Mutex<HashMap<String, MutingLimiter>>,
    rate: f64,
    burst: f64,
}

impl CursorLimiter {
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate,
            burst,
        }
    }

    /// Consume one token for a cursor update. Returns false when the update
    /// should be dropped (bucket empty or user muted).
    pub fn check(&self, room_id: &str, user_id: &str) -> bool {
        let key = format!("{room_id}:{user_id}");
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets
            .entry(key)
            .or_insert_with(|| MutingLimiter::new(self.rate, self.burst))
            .try_consume(1.0)
    }

    /// Drop a user's bucket on disconnect so the map does not grow with
    /// every user the process has ever seen.
    pub fn remove(&self, room_id: &str, user_id: &str) {
        let key = format!("{room_id}:{user_id}");
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.remove(&key);
    }

    pub fn tracked_users(&self) -> usize {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.len()
    }
}
