//! # onomast-core
//!
//! Rate-limited, concurrent enrichment engine for lists of given names.
//!
//! Each name goes through three remote calls: a classification into an
//! [`Origin`], then a narrative and a pronunciation assessment issued side
//! by side. Every call takes one token from a shared [`RateLimiter`], at
//! most a fixed number of names are in flight, and failed calls are
//! replaced by fallback values so a run always yields one record per name.
//!
//! Layers, top to bottom:
//!
//! - [`EnrichmentOrchestrator`] builds the run and collects statistics
//! - [`BatchScheduler`] bounds in-flight items and restores input order
//! - [`ItemPipeline`] sequences the three calls and applies fallbacks
//! - [`CallGateway`] rate-limits and counts every call
//! - [`EnrichmentBackend`] performs the calls ([`LlmBackend`] over HTTP)

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod llm_backend;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod rate_limiter;
pub mod sanitize;
pub mod scheduler;
pub mod secret;
pub mod stats;
pub mod taxonomy;
pub mod types;

pub use backend::{EnrichmentBackend, RawAssessment};
pub use config::{ConcurrencyBudget, EnrichConfig, RateBudget, ResolvedConfig, Tier};
pub use error::{CallError, ConfigError, EnrichError, PartialRun, Result, SchedulingError};
pub use gateway::{CallGateway, CallKind};
pub use llm_backend::LlmBackend;
pub use orchestrator::EnrichmentOrchestrator;
pub use pipeline::{ItemPipeline, ItemProcessor, PipelineSettings};
pub use rate_limiter::RateLimiter;
pub use scheduler::{BatchOutcome, BatchScheduler};
pub use secret::SecretString;
pub use stats::RunStatistics;
pub use taxonomy::{Difficulty, Origin};
pub use types::{ENRICHMENT_COLUMNS, EnrichmentRecord, Item, ItemId};
