//! Top-level entry point for one enrichment run.

use std::sync::Arc;

use onomast_llm::OpenAiCompatProvider;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backend::EnrichmentBackend;
use crate::config::{ConcurrencyBudget, RateBudget, ResolvedConfig};
use crate::error::{EnrichError, PartialRun, Result};
use crate::gateway::CallGateway;
use crate::llm_backend::LlmBackend;
use crate::pipeline::{ItemPipeline, PipelineSettings};
use crate::rate_limiter::RateLimiter;
use crate::scheduler::{BatchOutcome, BatchScheduler};
use crate::stats::{RunCounters, RunStatistics};
use crate::types::{EnrichmentRecord, Item};

/// Owns the backend and both budgets.
///
/// Every call to [`enrich`](Self::enrich) gets its own limiter, counters and
/// scheduler, so consecutive runs do not share tokens or statistics.
pub struct EnrichmentOrchestrator {
    backend: Arc<dyn EnrichmentBackend>,
    rate: RateBudget,
    concurrency: ConcurrencyBudget,
    settings: PipelineSettings,
    cancel: CancellationToken,
}

impl EnrichmentOrchestrator {
    pub fn new(
        backend: Arc<dyn EnrichmentBackend>,
        rate: RateBudget,
        concurrency: ConcurrencyBudget,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            backend,
            rate,
            concurrency,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Build an orchestrator that talks to the configured LLM provider.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let provider = OpenAiCompatProvider::with_api_key(
            config.provider.clone(),
            config.api_key.expose().to_string(),
        );
        let backend = LlmBackend::new(Arc::new(provider), config.model.clone());
        Self::new(
            Arc::new(backend),
            config.rate,
            config.concurrency,
            config.pipeline.clone(),
        )
    }

    pub fn rate(&self) -> RateBudget {
        self.rate
    }

    pub fn concurrency(&self) -> ConcurrencyBudget {
        self.concurrency
    }

    /// Token that stops dispatch when cancelled.
    ///
    /// Items already in flight run to completion and are returned inside
    /// [`EnrichError::Aborted`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Enrich `items`, returning one record per item in input order.
    pub async fn enrich(&self, items: Vec<Item>) -> Result<(Vec<EnrichmentRecord>, RunStatistics)> {
        let total = items.len();
        info!(
            items = total,
            rpm = self.rate.get(),
            max_concurrent = self.concurrency.get(),
            "starting enrichment run"
        );

        let counters = Arc::new(RunCounters::new());
        let gateway = CallGateway::new(
            self.backend.clone(),
            Arc::new(RateLimiter::new(self.rate)),
            counters.clone(),
        );
        let pipeline = ItemPipeline::new(gateway, self.settings.clone());
        let scheduler = BatchScheduler::new(Arc::new(pipeline), self.concurrency);

        let started = Instant::now();
        let outcome = scheduler.run(items, &self.cancel).await?;
        let stats = counters.snapshot(started.elapsed());

        match outcome {
            BatchOutcome::Complete(records) => {
                info!(
                    records = records.len(),
                    attempted = stats.attempted,
                    succeeded = stats.succeeded,
                    failed = stats.failed,
                    fallbacks = stats.fallbacks,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "enrichment run finished"
                );
                if stats.degraded() {
                    warn!(fallbacks = stats.fallbacks, "some values fell back to defaults");
                }
                Ok((records, stats))
            }
            BatchOutcome::Aborted(records) => {
                warn!(
                    completed = records.len(),
                    total, "enrichment run aborted"
                );
                Err(EnrichError::Aborted(PartialRun { records, stats }))
            }
        }
    }
}
