//! The remote-call seam.
//!
//! An [`EnrichmentBackend`] performs exactly one remote request per method
//! call and returns the reply in loosely typed form. Pacing, counting,
//! label validation and fallbacks are the caller's job, so backends stay
//! free of orchestration concerns. [`LlmBackend`](crate::llm_backend::LlmBackend)
//! is the production implementation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CallError;
use crate::taxonomy::Origin;

/// Assessment reply before its labels are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawAssessment {
    #[serde(alias = "pronunciation_spanish", alias = "espanol", alias = "español")]
    pub spanish: String,

    #[serde(alias = "pronunciation_foreign", alias = "extranjero")]
    pub foreign: String,

    #[serde(default, alias = "pronunciation_explanation", alias = "explicacion")]
    pub explanation: String,
}

/// One method per remote call kind.
#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    /// Origin label for `name`, as the remote side spelled it.
    async fn classify(&self, name: &str) -> Result<String, CallError>;

    /// Short free-text description of `name` given its origin.
    async fn narrate(&self, name: &str, category: Origin) -> Result<String, CallError>;

    /// Pronunciation difficulty of `name` given its origin.
    async fn assess(&self, name: &str, category: Origin) -> Result<RawAssessment, CallError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend for unit tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// What a scripted call does.
    #[derive(Clone)]
    pub(crate) enum Reply {
        Ok(String),
        Fail,
    }

    pub(crate) struct ScriptedBackend {
        pub classify: Reply,
        pub narrate: Reply,
        pub assess: Option<RawAssessment>,
        /// Failures to serve before each call kind starts succeeding.
        pub transient_failures: usize,
        pub delay: fn(&str) -> Duration,
        pub classify_calls: AtomicUsize,
        pub narrate_calls: AtomicUsize,
        pub assess_calls: AtomicUsize,
        pub seen_categories: Mutex<Vec<Origin>>,
    }

    fn no_delay(_: &str) -> Duration {
        Duration::ZERO
    }

    impl ScriptedBackend {
        pub fn healthy() -> Self {
            Self {
                classify: Reply::Ok("Vasco".into()),
                narrate: Reply::Ok("Nombre **vasco** de origen antiguo.".into()),
                assess: Some(RawAssessment {
                    spanish: "fácil".into(),
                    foreign: "difícil".into(),
                    explanation: "La \"tx\" cuesta.".into(),
                }),
                transient_failures: 0,
                delay: no_delay,
                classify_calls: AtomicUsize::new(0),
                narrate_calls: AtomicUsize::new(0),
                assess_calls: AtomicUsize::new(0),
                seen_categories: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                classify: Reply::Fail,
                narrate: Reply::Fail,
                assess: None,
                ..Self::healthy()
            }
        }

        pub fn total_calls(&self) -> usize {
            self.classify_calls.load(Ordering::SeqCst)
                + self.narrate_calls.load(Ordering::SeqCst)
                + self.assess_calls.load(Ordering::SeqCst)
        }

        fn transient(&self, calls_so_far: usize) -> Result<(), CallError> {
            if calls_so_far < self.transient_failures {
                Err(CallError::Provider(onomast_llm::ProviderError::Timeout))
            } else {
                Ok(())
            }
        }

        fn reply(reply: &Reply) -> Result<String, CallError> {
            match reply {
                Reply::Ok(text) => Ok(text.clone()),
                Reply::Fail => Err(CallError::Provider(
                    onomast_llm::ProviderError::RequestFailed("HTTP 400: scripted".into()),
                )),
            }
        }
    }

    #[async_trait]
    impl EnrichmentBackend for ScriptedBackend {
        async fn classify(&self, name: &str) -> Result<String, CallError> {
            let n = self.classify_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep((self.delay)(name)).await;
            self.transient(n)?;
            Self::reply(&self.classify)
        }

        async fn narrate(&self, name: &str, category: Origin) -> Result<String, CallError> {
            let n = self.narrate_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_categories.lock().push(category);
            tokio::time::sleep((self.delay)(name)).await;
            self.transient(n)?;
            Self::reply(&self.narrate)
        }

        async fn assess(&self, name: &str, category: Origin) -> Result<RawAssessment, CallError> {
            let n = self.assess_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_categories.lock().push(category);
            tokio::time::sleep((self.delay)(name)).await;
            self.transient(n)?;
            self.assess.clone().ok_or(CallError::EmptyReply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_assessment_accepts_aliases() {
        let a: RawAssessment = serde_json::from_str(
            r#"{"pronunciation_spanish": "fácil", "pronunciation_foreign": "difícil"}"#,
        )
        .unwrap();
        assert_eq!(a.spanish, "fácil");
        assert_eq!(a.foreign, "difícil");
        assert_eq!(a.explanation, "");
    }

    #[test]
    fn raw_assessment_requires_both_levels() {
        assert!(serde_json::from_str::<RawAssessment>(r#"{"spanish": "fácil"}"#).is_err());
    }
}
