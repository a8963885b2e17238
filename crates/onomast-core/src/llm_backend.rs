//! [`EnrichmentBackend`] over an LLM chat completion [`Provider`].

use std::sync::Arc;

use async_trait::async_trait;
use onomast_llm::json_repair::parse_object;
use onomast_llm::{ChatRequest, Provider};
use serde::Deserialize;
use tracing::trace;

use crate::backend::{EnrichmentBackend, RawAssessment};
use crate::error::CallError;
use crate::prompts;
use crate::taxonomy::Origin;

#[derive(Deserialize)]
struct OriginReply {
    #[serde(alias = "origen", alias = "category")]
    origin: String,
}

/// Sends one chat completion per call to `provider` using `model`.
pub struct LlmBackend {
    provider: Arc<dyn Provider>,
    model: String,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, CallError> {
        let response = self.provider.complete(&request).await?;
        let text = response
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CallError::EmptyReply)?;
        trace!(provider = self.provider.name(), reply = text, "raw reply");
        Ok(text.to_string())
    }
}

#[async_trait]
impl EnrichmentBackend for LlmBackend {
    async fn classify(&self, name: &str) -> Result<String, CallError> {
        let text = self
            .complete(prompts::classify_request(&self.model, name))
            .await?;
        // Some models ignore JSON mode and answer with the bare label.
        match parse_object::<OriginReply>(&text) {
            Ok(reply) => Ok(reply.origin),
            Err(_) if !text.contains('{') => Ok(text),
            Err(err) => Err(CallError::Malformed(err.to_string())),
        }
    }

    async fn narrate(&self, name: &str, category: Origin) -> Result<String, CallError> {
        self.complete(prompts::narrate_request(&self.model, name, category))
            .await
    }

    async fn assess(&self, name: &str, category: Origin) -> Result<RawAssessment, CallError> {
        let text = self
            .complete(prompts::assess_request(&self.model, name, category))
            .await?;
        parse_object::<RawAssessment>(&text).map_err(|err| CallError::Malformed(err.to_string()))
    }
}
