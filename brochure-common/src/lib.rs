//! Common types and utilities shared across the brochure crates.
//!
//! This crate defines the provider-agnostic LLM configuration, the shared
//! error type, observability helpers, and small text utilities used
//! throughout the workspace. It stays dependency-light so every crate can
//! depend on it.
//!
//! # Overview
//!
//! - [`LlmConfig`]: Provider-agnostic LLM configuration
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`BrochureError`] and [`Result`]: Shared error handling
//! - [`text`]: Character-safe truncation
//!
//! # Examples
//!
//! ```rust
//! use brochure_common::LlmConfig;
//!
//! let cfg = LlmConfig::default();
//! assert_eq!(cfg.model(), "gemini-2.5-flash");
//! assert_eq!(cfg.provider_name(), "openai");
//! ```
use serde::{Deserialize, Deserializer, Serialize};

pub mod observability;
pub mod text;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_COMPAT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_API_KEY_PLACEHOLDER: &str = "${GEMINI_API_KEY}";

/// Configuration for the text-completion provider.
///
/// The `provider` tag selects the wire protocol; the concrete clients live in
/// the `brochure-llm` crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    /// Any endpoint speaking the OpenAI chat-completions protocol, including
    /// Gemini's OpenAI-compatible surface.
    OpenAi {
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_api_key")]
        api_key: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
        #[serde(default, deserialize_with = "temperature")]
        temperature: Option<f32>,
    },
    /// Google's native `generateContent` API.
    Gemini {
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_api_key")]
        api_key: String,
        #[serde(default, deserialize_with = "temperature")]
        temperature: Option<f32>,
    },
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_api_key() -> String {
    DEFAULT_API_KEY_PLACEHOLDER.into()
}
fn default_openai_endpoint() -> String {
    DEFAULT_OPENAI_COMPAT_ENDPOINT.into()
}

/// A number from YAML, or its string form from an environment override.
fn temperature<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f32),
        Text(String),
    }

    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Number(t)) => Ok(Some(t)),
        Some(Loose::Text(raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid temperature {raw:?}"))),
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::OpenAi {
            model: default_model(),
            api_key: default_api_key(),
            endpoint: default_openai_endpoint(),
            temperature: None,
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model, .. } | Self::Gemini { model, .. } => model,
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            Self::OpenAi { api_key, .. } | Self::Gemini { api_key, .. } => api_key,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Gemini { .. } => "gemini",
        }
    }

    /// Reject configurations that cannot authenticate: an empty key or a
    /// `${VAR}` placeholder left unexpanded because the variable is unset.
    pub fn validate(&self) -> Result<()> {
        let key = self.api_key().trim();
        if key.is_empty() || (key.starts_with("${") && key.ends_with('}')) {
            return Err(BrochureError::Config(format!(
                "no API key configured for the {} provider (set GEMINI_API_KEY or llm.api_key)",
                self.provider_name()
            )));
        }
        Ok(())
    }
}

/// Error types used across the brochure system.
///
/// Every variant renders as a human-readable message; callers of the HTTP
/// surface only ever see that message.
#[derive(thiserror::Error, Debug)]
pub enum BrochureError {
    /// A single page or link fetch failed (network, timeout, DNS, non-2xx).
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The link-selection completion was not a usable JSON link list.
    #[error("Could not parse relevant links from model output: {0}")]
    SelectionParse(String),

    /// The brochure-generation completion failed.
    #[error("Brochure synthesis failed: {0}")]
    Synthesis(String),

    /// The text-completion provider failed outside of synthesis.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BrochureError {
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenient alias for results that use [`BrochureError`].
pub type Result<T> = std::result::Result<T, BrochureError>;
