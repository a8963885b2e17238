//! Run configuration: budgets, tier presets and provider selection.
//!
//! [`EnrichConfig`] is the user-facing, JSON-loadable shape (both
//! `snake_case` and `camelCase` keys are accepted). [`EnrichConfig::resolve`]
//! validates it into a [`ResolvedConfig`] that the orchestrator consumes.
//! Every problem surfaces here as a [`ConfigError`], before any request is
//! dispatched.
//!
//! Tier presets are data, not branches: they only pick the default
//! [`RateBudget`], which in turn derives the default [`ConcurrencyBudget`].

use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use onomast_llm::{LlmProviderConfig, RetryConfig, config as llm_config};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::PipelineSettings;
use crate::sanitize::DEFAULT_NARRATIVE_CAP;
use crate::secret::SecretString;

// ── Budgets ─────────────────────────────────────────────────────────────

/// Requests-per-minute ceiling. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateBudget(NonZeroU32);

impl RateBudget {
    pub fn new(rpm: u32) -> Result<Self, ConfigError> {
        NonZeroU32::new(rpm)
            .map(Self)
            .ok_or(ConfigError::ZeroRateBudget)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Maximum number of items in flight at once. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyBudget(NonZeroUsize);

impl ConcurrencyBudget {
    const DERIVED_MIN: usize = 5;
    const DERIVED_MAX: usize = 50;

    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(limit)
            .map(Self)
            .ok_or(ConfigError::ZeroConcurrency)
    }

    /// `clamp(rpm / 20, 5, 50)`, never above `rpm` itself.
    pub fn derived_from(rate: RateBudget) -> Self {
        let rpm = rate.get() as usize;
        let limit = (rpm / 20)
            .clamp(Self::DERIVED_MIN, Self::DERIVED_MAX)
            .min(rpm);
        // rpm >= 1, so limit >= 1.
        Self(NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

// ── Tiers ───────────────────────────────────────────────────────────────

/// Account tier at the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Level1,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Level1 => "level1",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "level1" => Ok(Tier::Level1),
            _ => Err(ConfigError::UnknownTier(s.to_string())),
        }
    }
}

/// Published requests-per-minute limit for one provider/tier/model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPreset {
    pub provider: &'static str,
    pub tier: Tier,
    /// `None` matches any model of the provider.
    pub model: Option<&'static str>,
    pub rpm: u32,
}

pub const TIER_PRESETS: &[TierPreset] = &[
    TierPreset {
        provider: "gemini",
        tier: Tier::Free,
        model: Some("gemini-2.5-flash"),
        rpm: 10,
    },
    TierPreset {
        provider: "gemini",
        tier: Tier::Free,
        model: Some("gemini-2.5-pro"),
        rpm: 5,
    },
    TierPreset {
        provider: "gemini",
        tier: Tier::Level1,
        model: Some("gemini-2.5-flash"),
        rpm: 1000,
    },
    TierPreset {
        provider: "gemini",
        tier: Tier::Level1,
        model: Some("gemini-2.5-pro"),
        rpm: 150,
    },
    TierPreset {
        provider: "openai",
        tier: Tier::Free,
        model: None,
        rpm: 20,
    },
    TierPreset {
        provider: "openai",
        tier: Tier::Level1,
        model: None,
        rpm: 500,
    },
];

/// Look up the preset rpm; an exact model entry beats a provider-wide one.
pub fn preset_rpm(provider: &str, tier: Tier, model: &str) -> Option<u32> {
    let candidates = || {
        TIER_PRESETS
            .iter()
            .filter(move |p| p.provider.eq_ignore_ascii_case(provider) && p.tier == tier)
    };
    candidates()
        .find(|p| p.model == Some(model))
        .or_else(|| candidates().find(|p| p.model.is_none()))
        .map(|p| p.rpm)
}

// ── User-facing config ──────────────────────────────────────────────────

/// Retry settings for a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries", alias = "maxRetries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms", alias = "baseDelayMs")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms", alias = "maxDelayMs")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::default()
        }
    }
}

/// Everything a run needs, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Provider name (`gemini` or `openai`).
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name; the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub tier: Tier,

    /// Explicit requests-per-minute, overriding the tier preset.
    #[serde(default)]
    pub rpm: Option<u32>,

    /// Explicit concurrency, overriding the derived value.
    #[serde(default, alias = "maxConcurrent")]
    pub max_concurrent: Option<usize>,

    #[serde(default = "default_narrative_cap", alias = "narrativeCap")]
    pub narrative_cap: usize,

    #[serde(default)]
    pub retry: RetrySettings,

    /// API key; the provider's environment variable when unset.
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<SecretString>,

    /// Alternative endpoint (proxy, local mock).
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,

    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

fn default_provider() -> String {
    "gemini".into()
}

fn default_narrative_cap() -> usize {
    DEFAULT_NARRATIVE_CAP
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            tier: Tier::default(),
            rpm: None,
            max_concurrent: None,
            narrative_cap: default_narrative_cap(),
            retry: RetrySettings::default(),
            api_key: None,
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl EnrichConfig {
    /// Shortest narrative cap that still leaves room for one char and `...`.
    pub const MIN_NARRATIVE_CAP: usize = 4;

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Validate against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Validate, reading credentials through `env`.
    pub fn resolve_with_env<F>(&self, env: F) -> Result<ResolvedConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut provider = llm_config::find_builtin(&self.provider)
            .ok_or_else(|| ConfigError::UnknownProvider(self.provider.clone()))?;

        let model = self
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| provider.default_model.clone())
            .ok_or_else(|| ConfigError::Invalid(format!("no model for {}", provider.name)))?;

        let rpm = match self.rpm {
            Some(rpm) => rpm,
            None => preset_rpm(&provider.name, self.tier, &model).ok_or_else(|| {
                ConfigError::UnknownModel {
                    tier: self.tier.to_string(),
                    model: model.clone(),
                }
            })?,
        };
        let rate = RateBudget::new(rpm)?;

        let concurrency = match self.max_concurrent {
            Some(limit) => ConcurrencyBudget::new(limit)?,
            None => ConcurrencyBudget::derived_from(rate),
        };

        if self.narrative_cap < Self::MIN_NARRATIVE_CAP {
            return Err(ConfigError::Invalid(format!(
                "narrative cap must be at least {}",
                Self::MIN_NARRATIVE_CAP
            )));
        }

        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.is_blank())
            .or_else(|| {
                env(&provider.api_key_env)
                    .filter(|k| !k.trim().is_empty())
                    .map(SecretString::from)
            })
            .ok_or_else(|| ConfigError::MissingApiKey {
                env: provider.api_key_env.clone(),
            })?;

        if let Some(base_url) = self.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            provider = provider.with_base_url(base_url.trim());
        }
        if self.timeout_secs.is_some() {
            provider.timeout_secs = self.timeout_secs;
        }

        Ok(ResolvedConfig {
            provider,
            model,
            tier: self.tier,
            api_key,
            rate,
            concurrency,
            pipeline: PipelineSettings {
                narrative_cap: self.narrative_cap,
                retry: self.retry.to_retry_config(),
            },
        })
    }
}

/// A validated configuration, ready to build an orchestrator from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: LlmProviderConfig,
    pub model: String,
    pub tier: Tier,
    pub api_key: SecretString,
    pub rate: RateBudget,
    pub concurrency: ConcurrencyBudget,
    pub pipeline: PipelineSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_key(key: &str) -> Option<String> {
        (key == "GEMINI_API_KEY" || key == "OPENAI_API_KEY").then(|| "env-key".to_string())
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn budgets_reject_zero() {
        assert!(matches!(RateBudget::new(0), Err(ConfigError::ZeroRateBudget)));
        assert!(matches!(
            ConcurrencyBudget::new(0),
            Err(ConfigError::ZeroConcurrency)
        ));
        assert_eq!(RateBudget::new(7).unwrap().get(), 7);
    }

    #[test]
    fn derived_concurrency() {
        let derive = |rpm| ConcurrencyBudget::derived_from(RateBudget::new(rpm).unwrap()).get();
        assert_eq!(derive(1), 1);
        assert_eq!(derive(3), 3);
        assert_eq!(derive(10), 5);
        assert_eq!(derive(150), 7);
        assert_eq!(derive(500), 25);
        assert_eq!(derive(1000), 50);
        assert_eq!(derive(100_000), 50);
    }

    #[test]
    fn tier_parse_and_display() {
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert_eq!("LEVEL1".parse::<Tier>().unwrap(), Tier::Level1);
        assert!(matches!("gold".parse::<Tier>(), Err(ConfigError::UnknownTier(_))));
        assert_eq!(Tier::Level1.to_string(), "level1");
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(preset_rpm("gemini", Tier::Free, "gemini-2.5-flash"), Some(10));
        assert_eq!(preset_rpm("gemini", Tier::Free, "gemini-2.5-pro"), Some(5));
        assert_eq!(preset_rpm("gemini", Tier::Level1, "gemini-2.5-flash"), Some(1000));
        assert_eq!(preset_rpm("gemini", Tier::Level1, "gemini-2.5-pro"), Some(150));
        assert_eq!(preset_rpm("openai", Tier::Free, "gpt-4o-mini"), Some(20));
        assert_eq!(preset_rpm("openai", Tier::Level1, "anything"), Some(500));
        assert_eq!(preset_rpm("gemini", Tier::Free, "gemini-1.0"), None);
    }

    #[test]
    fn resolve_defaults() {
        let resolved = EnrichConfig::default().resolve_with_env(env_with_key).unwrap();
        assert_eq!(resolved.provider.name, "gemini");
        assert_eq!(resolved.model, "gemini-2.5-flash");
        assert_eq!(resolved.rate.get(), 10);
        assert_eq!(resolved.concurrency.get(), 5);
        assert_eq!(resolved.api_key.expose(), "env-key");
        assert_eq!(resolved.pipeline.narrative_cap, 500);
        assert_eq!(resolved.pipeline.retry.max_retries, 2);
    }

    #[test]
    fn resolve_overrides() {
        let config = EnrichConfig {
            provider: "openai".into(),
            model: Some("gpt-4o".into()),
            tier: Tier::Level1,
            rpm: Some(120),
            max_concurrent: Some(3),
            api_key: Some("explicit".into()),
            base_url: Some("http://127.0.0.1:1234/v1".into()),
            timeout_secs: Some(9),
            ..EnrichConfig::default()
        };
        let resolved = config.resolve_with_env(no_env).unwrap();
        assert_eq!(resolved.rate.get(), 120);
        assert_eq!(resolved.concurrency.get(), 3);
        assert_eq!(resolved.api_key.expose(), "explicit");
        assert_eq!(resolved.provider.base_url, "http://127.0.0.1:1234/v1");
        assert_eq!(resolved.provider.timeout_secs, Some(9));
        assert_eq!(resolved.tier, Tier::Level1);
    }

    #[test]
    fn resolve_errors() {
        let err = EnrichConfig {
            provider: "anthropic".into(),
            ..EnrichConfig::default()
        }
        .resolve_with_env(env_with_key)
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(_)));

        let err = EnrichConfig {
            model: Some("gemini-9-ultra".into()),
            ..EnrichConfig::default()
        }
        .resolve_with_env(env_with_key)
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel { .. }));

        let err = EnrichConfig {
            rpm: Some(0),
            ..EnrichConfig::default()
        }
        .resolve_with_env(env_with_key)
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroRateBudget));

        let err = EnrichConfig {
            max_concurrent: Some(0),
            ..EnrichConfig::default()
        }
        .resolve_with_env(env_with_key)
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroConcurrency));

        let err = EnrichConfig {
            narrative_cap: 2,
            ..EnrichConfig::default()
        }
        .resolve_with_env(env_with_key)
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EnrichConfig::default().resolve_with_env(no_env).unwrap_err();
        match err {
            ConfigError::MissingApiKey { env } => assert_eq!(env, "GEMINI_API_KEY"),
            other => panic!("expected MissingApiKey, got {other:?}"),
        }
    }

    #[test]
    fn unknown_model_allowed_with_explicit_rpm() {
        let config = EnrichConfig {
            model: Some("gemini-3.0-experimental".into()),
            rpm: Some(30),
            ..EnrichConfig::default()
        };
        let resolved = config.resolve_with_env(env_with_key).unwrap();
        assert_eq!(resolved.rate.get(), 30);
        assert_eq!(resolved.model, "gemini-3.0-experimental");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = EnrichConfig {
            api_key: Some("   ".into()),
            ..EnrichConfig::default()
        };
        let err = config
            .resolve_with_env(|_| Some(String::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
    }

    #[test]
    fn json_accepts_camel_case() {
        let json = r#"{
            "provider": "openai",
            "tier": "level1",
            "maxConcurrent": 4,
            "narrativeCap": 300,
            "apiKey": "from-file",
            "retry": {"maxRetries": 0}
        }"#;
        let config = EnrichConfig::from_json(json).unwrap();
        assert_eq!(config.max_concurrent, Some(4));
        assert_eq!(config.narrative_cap, 300);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.base_delay_ms, 1_000);

        let resolved = config.resolve_with_env(no_env).unwrap();
        assert_eq!(resolved.rate.get(), 500);
        assert_eq!(resolved.api_key.expose(), "from-file");
    }

    #[test]
    fn json_empty_object_is_default() {
        let config = EnrichConfig::from_json("{}").unwrap();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.tier, Tier::Free);
        assert_eq!(config.narrative_cap, 500);
    }

    #[test]
    fn from_file_reads_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onomast.json");
        std::fs::write(&path, r#"{"rpm": 42}"#).unwrap();
        assert_eq!(EnrichConfig::from_file(&path).unwrap().rpm, Some(42));

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            EnrichConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EnrichConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn resolved_debug_redacts_key() {
        let config = EnrichConfig {
            api_key: Some("AIza-secret-123".into()),
            ..EnrichConfig::default()
        };
        let resolved = config.resolve_with_env(no_env).unwrap();
        let debug = format!("{resolved:?}");
        assert!(!debug.contains("AIza-secret-123"));
        assert!(debug.contains("[REDACTED]"));
    }
}
