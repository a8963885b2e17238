//! One logical remote call: token, request, verdict, count.
//!
//! Every call an item makes goes through [`CallGateway::invoke`], which
//! takes one rate-limiter token, runs the request, turns the loosely typed
//! backend reply into a typed value and bumps the run counters. It never
//! retries; a retry is simply another invocation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backend::{EnrichmentBackend, RawAssessment};
use crate::error::CallError;
use crate::rate_limiter::RateLimiter;
use crate::stats::RunCounters;
use crate::taxonomy::{Difficulty, Origin};
use crate::types::{Assessment, ItemId};

/// Which of the three calls an invocation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Classify,
    Narrate,
    Assess,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Classify => "classify",
            CallKind::Narrate => "narrate",
            CallKind::Assess => "assess",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared by every pipeline of a run.
#[derive(Clone)]
pub struct CallGateway {
    backend: Arc<dyn EnrichmentBackend>,
    limiter: Arc<RateLimiter>,
    counters: Arc<RunCounters>,
}

impl CallGateway {
    pub fn new(
        backend: Arc<dyn EnrichmentBackend>,
        limiter: Arc<RateLimiter>,
        counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            backend,
            limiter,
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Run `call` as one counted, rate-limited attempt.
    pub async fn invoke<T, F, Fut>(&self, item_id: ItemId, kind: CallKind, call: F) -> Result<T, CallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        self.limiter.acquire().await;
        self.counters.record_attempt();
        let started = Instant::now();

        let result = call().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                self.counters.record_success();
                debug!(item_id, call = %kind, elapsed_ms, "call succeeded");
            }
            Err(err) => {
                self.counters.record_failure();
                warn!(item_id, call = %kind, elapsed_ms, error = %err, "call failed");
            }
        }
        result
    }

    pub async fn classify(&self, item_id: ItemId, name: &str) -> Result<Origin, CallError> {
        self.invoke(item_id, CallKind::Classify, || async {
            let label = self.backend.classify(name).await?;
            label
                .parse::<Origin>()
                .map_err(|_| CallError::UnexpectedLabel(label))
        })
        .await
    }

    pub async fn narrate(
        &self,
        item_id: ItemId,
        name: &str,
        category: Origin,
    ) -> Result<String, CallError> {
        self.invoke(item_id, CallKind::Narrate, || async {
            let text = self.backend.narrate(name, category).await?;
            if text.trim().is_empty() {
                return Err(CallError::EmptyReply);
            }
            Ok(text)
        })
        .await
    }

    pub async fn assess(
        &self,
        item_id: ItemId,
        name: &str,
        category: Origin,
    ) -> Result<Assessment, CallError> {
        self.invoke(item_id, CallKind::Assess, || async {
            let raw = self.backend.assess(name, category).await?;
            typed_assessment(raw)
        })
        .await
    }
}

fn typed_assessment(raw: RawAssessment) -> Result<Assessment, CallError> {
    let level = |label: String| {
        label
            .parse::<Difficulty>()
            .map_err(|_| CallError::UnexpectedLabel(label))
    };
    Ok(Assessment {
        spanish: level(raw.spanish)?,
        foreign: level(raw.foreign)?,
        explanation: raw.explanation,
    })
}
