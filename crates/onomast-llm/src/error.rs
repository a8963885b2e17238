//! Errors returned by [`Provider`](crate::Provider) implementations.
//!
//! Whether an error is worth retrying is decided in [`crate::retry`], not
//! here.

use thiserror::Error;

/// One failed chat completion.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success status (body included).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication with the provider was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider returned a rate-limit response (HTTP 429).
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait time before retrying, in milliseconds.
        retry_after_ms: u64,
    },

    /// The requested model does not exist on the provider.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// No API key was given and the provider's key variable is unset.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The provider returned a response that could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request exceeded the configured timeout.
    #[error("timeout")]
    Timeout,

    /// Connection, TLS or body transfer failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
