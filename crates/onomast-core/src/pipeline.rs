//! Per-item call chain: classify, then narrate and assess side by side.
//!
//! [`ItemPipeline::process`] cannot fail. Each call that does not produce a
//! usable value is replaced by its fallback, and a failed classification
//! still drives the two dependent calls with the fallback category.

use async_trait::async_trait;
use onomast_llm::RetryConfig;
use onomast_llm::retry::compute_delay;
use tracing::{debug, warn};

use crate::error::CallError;
use crate::gateway::{CallGateway, CallKind};
use crate::sanitize::{DEFAULT_NARRATIVE_CAP, clean_narrative, clean_text};
use crate::taxonomy::Origin;
use crate::types::{
    Assessment, EnrichmentRecord, FALLBACK_EXPLANATION, Item, ItemId, fallback_narrative,
};

/// Something that turns one item into one record.
///
/// The scheduler only depends on this trait, which keeps it testable with
/// processors that never touch the network.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, item: Item) -> EnrichmentRecord;
}

/// Knobs for the item pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Maximum narrative length in characters.
    pub narrative_cap: usize,
    /// Retry policy applied to each call separately.
    pub retry: RetryConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            narrative_cap: DEFAULT_NARRATIVE_CAP,
            retry: RetryConfig::disabled(),
        }
    }
}

pub struct ItemPipeline {
    gateway: CallGateway,
    settings: PipelineSettings,
}

impl ItemPipeline {
    pub fn new(gateway: CallGateway, settings: PipelineSettings) -> Self {
        Self { gateway, settings }
    }

    /// Invoke `call` until it succeeds, fails permanently or runs out of retries.
    async fn with_retry<T, F, Fut>(&self, item_id: ItemId, kind: CallKind, mut call: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CallError>>,
    {
        let policy = &self.settings.retry;
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < policy.max_retries && err.is_retryable() => {
                    let delay = match &err {
                        CallError::Provider(provider_err) => policy.delay_for(provider_err, attempt),
                        _ => compute_delay(policy, attempt),
                    };
                    debug!(
                        item_id,
                        call = %kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Category, narrative and assessment all defaulted; three fallbacks.
    fn fallback_record(&self, item: &Item) -> EnrichmentRecord {
        let counters = self.gateway.counters();
        for _ in 0..3 {
            counters.record_fallback();
        }
        let category = Origin::FALLBACK;
        EnrichmentRecord::assemble(
            item.id,
            category,
            clean_narrative(
                &fallback_narrative(category),
                item.payload.trim(),
                self.settings.narrative_cap,
            ),
            Assessment::fallback(),
        )
    }
}

#[async_trait]
impl ItemProcessor for ItemPipeline {
    async fn process(&self, item: Item) -> EnrichmentRecord {
        if item.is_blank() {
            warn!(item_id = item.id, "blank payload, using fallback record");
            return self.fallback_record(&item);
        }

        let id = item.id;
        let name = item.payload.trim();
        let gw = &self.gateway;
        let counters = gw.counters();

        let category = match self
            .with_retry(id, CallKind::Classify, || gw.classify(id, name))
            .await
        {
            Ok(category) => category,
            Err(err) => {
                warn!(item_id = id, error = %err, "classification failed, using fallback category");
                counters.record_fallback();
                Origin::FALLBACK
            }
        };

        let (narrative, assessment) = tokio::join!(
            self.with_retry(id, CallKind::Narrate, || gw.narrate(id, name, category)),
            self.with_retry(id, CallKind::Assess, || gw.assess(id, name, category)),
        );

        let cap = self.settings.narrative_cap;
        let narrative = narrative
            .map(|text| clean_narrative(&text, name, cap))
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                counters.record_fallback();
                clean_narrative(&fallback_narrative(category), name, cap)
            });

        let assessment = match assessment {
            Ok(mut a) => {
                a.explanation = clean_text(&a.explanation, name);
                if a.explanation.is_empty() {
                    counters.record_fallback();
                    a.explanation = FALLBACK_EXPLANATION.to_string();
                }
                a
            }
            Err(_) => {
                counters.record_fallback();
                Assessment::fallback()
            }
        };

        EnrichmentRecord::assemble(id, category, narrative, assessment)
    }
}
