//! Chat completion client for the onomast enrichment pipeline.
//!
//! This crate is the vendor boundary: everything that knows about HTTP,
//! API keys and the OpenAI chat completion wire format lives here. The
//! enrichment core only sees the [`Provider`] trait.
//!
//! # Architecture
//!
//! - [`Provider`] trait defines the chat completion interface
//! - [`OpenAiCompatProvider`] implements it for any OpenAI-compatible API
//!   (OpenAI itself and Gemini's compatibility endpoint)
//! - [`LlmProviderConfig`] describes how to connect to a provider
//! - [`retry`] holds the backoff policy callers apply around single calls
//! - [`json_repair`] recovers JSON objects from chatty model output
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use onomast_llm::{config, ChatMessage, ChatRequest, OpenAiCompatProvider, Provider};
//!
//! let preset = config::find_builtin("gemini").unwrap();
//! let provider = OpenAiCompatProvider::with_api_key(preset, key);
//!
//! let request = ChatRequest::new("gemini-2.5-flash", vec![
//!     ChatMessage::user("¿De dónde viene el nombre Aitor?"),
//! ]);
//! let response = provider.complete(&request).await?;
//! println!("{}", response.text().unwrap_or_default());
//! ```

pub mod config;
pub mod error;
pub mod json_repair;
pub mod openai_compat;
pub mod provider;
pub mod retry;
pub mod types;

pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use retry::RetryConfig;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, Usage};
