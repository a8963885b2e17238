//! Error types for the enrichment engine.
//!
//! - [`CallError`]: one remote call failed. Absorbed by the item pipeline.
//! - [`ConfigError`]: the run cannot start. Raised before any dispatch.
//! - [`SchedulingError`]: the scheduler broke an invariant. Fails the run.
//! - [`EnrichError`]: what [`EnrichmentOrchestrator::enrich`] returns.
//!
//! [`EnrichmentOrchestrator::enrich`]: crate::orchestrator::EnrichmentOrchestrator::enrich

use std::path::PathBuf;

use onomast_llm::ProviderError;
use thiserror::Error;

use crate::stats::RunStatistics;
use crate::types::{EnrichmentRecord, ItemId};

/// A single remote call that did not produce a usable value.
#[derive(Debug, Error)]
pub enum CallError {
    /// Transport failure or non-success status from the provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider answered, but with no text.
    #[error("empty reply")]
    EmptyReply,

    /// The reply could not be parsed into the expected shape.
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// The reply named a label outside the closed set.
    #[error("unexpected label {0:?}")]
    UnexpectedLabel(String),
}

impl CallError {
    /// Whether a fresh attempt might succeed.
    ///
    /// Model-side problems (empty, malformed, off-list) are sampled again;
    /// provider errors defer to the provider's own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::Provider(err) => onomast_llm::retry::is_retryable(err),
            CallError::EmptyReply | CallError::Malformed(_) | CallError::UnexpectedLabel(_) => {
                true
            }
        }
    }
}

/// The run cannot start with this configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown provider '{0}' (expected gemini or openai)")]
    UnknownProvider(String),

    #[error("unknown tier '{0}' (expected free or level1)")]
    UnknownTier(String),

    #[error("no rate preset for model '{model}' on the {tier} tier; set an explicit rpm")]
    UnknownModel { tier: String, model: String },

    #[error("requests-per-minute budget must be greater than zero")]
    ZeroRateBudget,

    #[error("concurrency budget must be greater than zero")]
    ZeroConcurrency,

    #[error("missing API key: set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The scheduler could not uphold one record per input item.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("duplicate item id {0}")]
    DuplicateItemId(ItemId),

    #[error("no record produced for item {0}")]
    MissingRecord(ItemId),

    #[error("record for item {0}, which was not scheduled or was already recorded")]
    UnexpectedRecord(ItemId),

    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for SchedulingError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            SchedulingError::TaskFailed(format!("panicked: {err}"))
        } else {
            SchedulingError::TaskFailed(err.to_string())
        }
    }
}

/// Records completed before an abort, in input order.
#[derive(Debug, Clone)]
pub struct PartialRun {
    pub records: Vec<EnrichmentRecord>,
    pub stats: RunStatistics,
}

/// Everything that can stop [`enrich`](crate::orchestrator::EnrichmentOrchestrator::enrich)
/// from returning a complete result.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("run aborted after {} records", .0.records.len())]
    Aborted(PartialRun),
}

pub type Result<T> = std::result::Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_retryability() {
        assert!(CallError::EmptyReply.is_retryable());
        assert!(CallError::UnexpectedLabel("Klingon".into()).is_retryable());
        assert!(CallError::Provider(ProviderError::Timeout).is_retryable());
        assert!(!CallError::Provider(ProviderError::AuthFailed("no".into())).is_retryable());
    }

    #[test]
    fn provider_error_is_transparent() {
        let err: CallError = ProviderError::Timeout.into();
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn config_error_messages() {
        let err = ConfigError::MissingApiKey {
            env: "GEMINI_API_KEY".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing API key: set the GEMINI_API_KEY environment variable"
        );
        let err = ConfigError::UnknownModel {
            tier: "free".into(),
            model: "gemini-9".into(),
        };
        assert!(err.to_string().contains("gemini-9"));
    }

    #[test]
    fn aborted_reports_count() {
        let err = EnrichError::Aborted(PartialRun {
            records: Vec::new(),
            stats: RunStatistics::default(),
        });
        assert_eq!(err.to_string(), "run aborted after 0 records");
    }

    #[test]
    fn wraps_into_enrich_error() {
        let err: EnrichError = SchedulingError::DuplicateItemId(3).into();
        assert_eq!(err.to_string(), "duplicate item id 3");
        let err: EnrichError = ConfigError::ZeroRateBudget.into();
        assert!(matches!(err, EnrichError::Config(ConfigError::ZeroRateBudget)));
    }
}
