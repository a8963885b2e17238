//! Token-bucket limiter for outbound requests.
//!
//! The bucket holds up to `rpm` tokens, starts empty and refills
//! continuously at `rpm / 60` tokens per second. Every remote attempt
//! consumes one token. An empty start means the first grant comes after
//! `60 / rpm` seconds and exactly `rpm` grants fit in the first minute.
//!
//! # Arithmetic
//!
//! Credit is kept as an integer in units of `1 / (60 * 10^9)` token, so
//! one nanosecond of elapsed time adds exactly `rpm` units. There is no
//! floating-point drift and the wait until the next token is an exact
//! ceiling division.
//!
//! # Fairness
//!
//! Waiters are not queued. A caller that finds the bucket empty computes
//! its wait, releases the lock, sleeps and tries again, racing with every
//! other waiter for the token that has accrued meanwhile. The lock is never
//! held across an await point.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::config::RateBudget;

/// Credit units per token: nanoseconds in a minute.
const UNITS_PER_TOKEN: u128 = 60 * 1_000_000_000;

struct Bucket {
    credit: u128,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, rpm: u128, capacity: u128) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        self.credit = self
            .credit
            .saturating_add(elapsed.saturating_mul(rpm))
            .min(capacity);
        self.last_refill = now;
    }
}

/// Requests-per-minute throttle shared by every call of a run.
pub struct RateLimiter {
    budget: RateBudget,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// An empty bucket for `budget` requests per minute.
    pub fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            bucket: Mutex::new(Bucket {
                credit: 0,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn budget(&self) -> RateBudget {
        self.budget
    }

    fn rpm(&self) -> u128 {
        u128::from(self.budget.get())
    }

    /// Take a token if one is available right now, else report the wait.
    fn take_or_wait(&self) -> Option<Duration> {
        let rpm = self.rpm();
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), rpm, rpm * UNITS_PER_TOKEN);
        if bucket.credit >= UNITS_PER_TOKEN {
            bucket.credit -= UNITS_PER_TOKEN;
            return None;
        }
        let missing = UNITS_PER_TOKEN - bucket.credit;
        let nanos = missing.div_ceil(rpm);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Never fails. Cancel-safe: dropping the future before it resolves
    /// consumes nothing.
    pub async fn acquire(&self) {
        while let Some(wait) = self.take_or_wait() {
            trace!(wait_ms = wait.as_millis() as u64, "rate limiter waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Consume a token only if one is available immediately.
    pub fn try_acquire(&self) -> bool {
        self.take_or_wait().is_none()
    }

    /// Whole tokens currently in the bucket (after refilling).
    pub fn available(&self) -> u32 {
        let rpm = self.rpm();
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now(), rpm, rpm * UNITS_PER_TOKEN);
        u32::try_from(bucket.credit / UNITS_PER_TOKEN).unwrap_or(u32::MAX)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rpm", &self.budget.get())
            .finish_non_exhaustive()
    }
}
