//! Provider connection settings and the built-in provider presets.
//!
//! An [`LlmProviderConfig`] says where a provider lives and which
//! environment variable carries its key. Only the two vendors the
//! enrichment tool supports ship as presets; anything else reachable over
//! the OpenAI wire format can be described by hand.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default per-request timeout when a config leaves `timeout_secs` unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for one OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider name (e.g. "gemini", "openai").
    pub name: String,

    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,

    /// Environment variable that holds the API key.
    pub api_key_env: String,

    /// Model used when the caller does not pick one.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl LlmProviderConfig {
    /// Effective request timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Returns a copy pointing at a different base URL.
    ///
    /// Used for proxies and for pointing the client at a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Returns the built-in provider presets.
pub fn builtin_providers() -> Vec<LlmProviderConfig> {
    vec![
        LlmProviderConfig {
            name: "gemini".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            default_model: Some("gemini-2.5-flash".into()),
            headers: HashMap::new(),
            timeout_secs: None,
        },
        LlmProviderConfig {
            name: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            default_model: Some("gpt-4o-mini".into()),
            headers: HashMap::new(),
            timeout_secs: None,
        },
    ]
}

/// Looks up a built-in preset by name (case-insensitive).
pub fn find_builtin(name: &str) -> Option<LlmProviderConfig> {
    builtin_providers()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        let names: Vec<String> = builtin_providers().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["gemini", "openai"]);
    }

    #[test]
    fn gemini_preset() {
        let gemini = find_builtin("gemini").unwrap();
        assert_eq!(
            gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        assert_eq!(gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(gemini.default_model.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn openai_preset() {
        let openai = find_builtin("OpenAI").unwrap();
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
        assert_eq!(openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn unknown_provider() {
        assert!(find_builtin("anthropic").is_none());
    }

    #[test]
    fn timeout_defaults() {
        let mut cfg = find_builtin("gemini").unwrap();
        assert_eq!(cfg.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
        cfg.timeout_secs = Some(5);
        assert_eq!(cfg.timeout().as_secs(), 5);
    }

    #[test]
    fn base_url_override() {
        let cfg = find_builtin("openai")
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/v1");
        assert_eq!(cfg.base_url, "http://127.0.0.1:9999/v1");
        assert_eq!(cfg.name, "openai");
    }

    #[test]
    fn deserialize_minimal() {
        let json = r#"{
            "name": "local",
            "base_url": "http://localhost:8080/v1",
            "api_key_env": "LOCAL_KEY"
        }"#;
        let cfg: LlmProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.name, "local");
        assert!(cfg.default_model.is_none());
        assert!(cfg.headers.is_empty());
        assert!(cfg.timeout_secs.is_none());
    }
}
