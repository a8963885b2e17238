//! OpenAI-compatible provider implementation.
//!
//! [`OpenAiCompatProvider`] talks to any endpoint that accepts the OpenAI
//! chat completion format, which covers both OpenAI and Gemini's
//! compatibility API.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Fallback wait reported for a 429 that carries no hint.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// A provider that uses the OpenAI-compatible chat completion API.
pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Create a provider that reads its key from `config.api_key_env` at
    /// request time.
    pub fn new(config: LlmProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// Create a provider with an explicit API key.
    pub fn with_api_key(config: LlmProviderConfig, api_key: String) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            api_key: Some(api_key),
        }
    }

    pub fn config(&self) -> &LlmProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Explicit key first, then the environment.
    fn resolve_api_key(&self) -> Result<String> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ProviderError::NotConfigured(format!("set {} env var", self.config.api_key_env))
        })
    }

    /// Turn a non-success response into the matching [`ProviderError`].
    async fn status_error(&self, model: &str, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let header_hint = retry_after_header_ms(response.headers());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => {
                let retry_after_ms = header_hint
                    .or_else(|| retry_after_body_ms(&body))
                    .unwrap_or(DEFAULT_RETRY_AFTER_MS);
                warn!(provider = %self.config.name, retry_after_ms, "provider rate limit hit");
                ProviderError::RateLimited { retry_after_ms }
            }
            401 | 403 => ProviderError::AuthFailed(error_message(&body).unwrap_or(body)),
            404 => ProviderError::ModelNotFound(format!("model '{model}': {body}")),
            _ => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.resolve_api_key()?;
        let url = self.completions_url();

        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(&url)
            .timeout(self.config.timeout())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");

        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req.json(request).send().await.map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(self.status_error(&request.model, response).await);
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
            }
        })?;

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            choices = chat_response.choices.len(),
            "chat completion response received"
        );

        Ok(chat_response)
    }
}

fn map_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err)
    }
}

/// The `error` object of a body, unwrapping Gemini's one-element array.
fn error_object(body: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let value = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    value.get("error").cloned()
}

/// `error.message`, or `error` itself when it is a plain string.
fn error_message(body: &str) -> Option<String> {
    let error = error_object(body)?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(String::from)
}

/// Numeric `Retry-After` header in seconds. HTTP-date values are ignored.
fn retry_after_header_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let secs: f64 = headers.get("retry-after")?.to_str().ok()?.trim().parse().ok()?;
    Some(secs_to_ms(secs))
}

/// Wait hint carried in a 429 body.
///
/// Understands `retry_after_ms`, `retry_after` (seconds) and the
/// `RetryInfo` detail Gemini attaches (`"retryDelay": "17s"`).
fn retry_after_body_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(ms) = value.get("retry_after_ms").and_then(|v| v.as_u64()) {
        return Some(ms);
    }
    if let Some(secs) = value.get("retry_after").and_then(|v| v.as_f64()) {
        return Some(secs_to_ms(secs));
    }
    error_object(body)?
        .get("details")?
        .as_array()?
        .iter()
        .filter_map(|detail| detail.get("retryDelay")?.as_str())
        .find_map(|delay| delay.trim().strip_suffix('s')?.parse::<f64>().ok())
        .map(secs_to_ms)
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).max(0.0) as u64
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.config.timeout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> LlmProviderConfig {
        LlmProviderConfig {
            name: "test-provider".into(),
            base_url: "https://api.example.com/v1".into(),
            api_key_env: "ONOMAST_TEST_PROVIDER_KEY_UNSET_4821".into(),
            default_model: Some("test-model".into()),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }

    #[test]
    fn completions_url_construction() {
        let provider = OpenAiCompatProvider::new(test_config());
        assert_eq!(
            provider.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn completions_url_strips_trailing_slash() {
        let config = test_config().with_base_url("https://api.example.com/v1/");
        let provider = OpenAiCompatProvider::new(config);
        assert_eq!(
            provider.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn explicit_key_wins() {
        let provider = OpenAiCompatProvider::with_api_key(test_config(), "sk-explicit".into());
        assert_eq!(provider.resolve_api_key().unwrap(), "sk-explicit");
    }

    #[test]
    fn missing_env_key_is_not_configured() {
        let provider = OpenAiCompatProvider::new(test_config());
        let err = provider.resolve_api_key().unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("ONOMAST_TEST_PROVIDER_KEY_UNSET_4821"));
    }

    #[test]
    fn debug_hides_api_key() {
        let provider =
            OpenAiCompatProvider::with_api_key(test_config(), "sk-secret-key-12345".into());
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("sk-secret-key-12345"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn retry_hint_from_body() {
        assert_eq!(retry_after_body_ms(r#"{"retry_after_ms": 2500}"#), Some(2500));
        assert_eq!(retry_after_body_ms(r#"{"retry_after": 3.5}"#), Some(3500));
        assert_eq!(retry_after_body_ms(r#"{"error": "slow down"}"#), None);
        assert_eq!(retry_after_body_ms("not json"), None);
    }

    #[test]
    fn retry_hint_from_gemini_retry_info() {
        let body = r#"[{"error": {
            "code": 429,
            "message": "Quota exceeded",
            "details": [
                {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "17s"}
            ]
        }}]"#;
        assert_eq!(retry_after_body_ms(body), Some(17_000));
    }

    #[test]
    fn retry_hint_from_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "2".parse().unwrap());
        assert_eq!(retry_after_header_ms(&headers), Some(2000));
        headers.insert("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after_header_ms(&headers), None);
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(
            error_message(r#"[{"error": {"code": 403, "message": "API key not valid"}}]"#).as_deref(),
            Some("API key not valid")
        );
        assert_eq!(error_message(r#"{"error": "denied"}"#).as_deref(), Some("denied"));
        assert!(error_message("<html>").is_none());
    }
}
