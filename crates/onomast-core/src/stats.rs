//! Per-run call counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Live counters shared by every gateway invocation of a run.
#[derive(Debug, Default)]
pub struct RunCounters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    fallbacks: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// One output value was replaced by its default.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the counters together with the run's wall-clock time.
    pub fn snapshot(&self, elapsed: Duration) -> RunStatistics {
        RunStatistics {
            attempted: self.attempted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Read-only view of a finished (or aborted) run.
///
/// `attempted`, `succeeded` and `failed` count remote calls, not items: one
/// item costs three calls plus any retries, and a retried call that later
/// succeeds still leaves its failed attempts in `failed`. `fallbacks`
/// counts output values (category, narrative, assessment, explanation)
/// that ended up as their default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub fallbacks: u64,
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Attempted calls per minute of wall-clock time.
    pub fn effective_rpm(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.attempted as f64 * 60.0 / secs
    }

    /// Fraction of attempted calls that succeeded, 1.0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 1.0;
        }
        self.succeeded as f64 / self.attempted as f64
    }

    /// True when at least one output value fell back to its default.
    pub fn degraded(&self) -> bool {
        self.fallbacks > 0
    }
}
