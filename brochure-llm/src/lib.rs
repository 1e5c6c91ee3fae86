//! Provider-agnostic text-completion integration.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and concrete
//! provider implementations for OpenAI-compatible endpoints and the native
//! Gemini API. [`build_client`] initializes a client from a
//! [`brochure_common::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use brochure_common::{LlmConfig, Result};
//! use brochure_llm::build_client;
//!
//! # fn main() -> Result<()> {
//! let cfg = LlmConfig::Gemini {
//!     model: "gemini-2.5-flash".into(),
//!     api_key: "my-key".into(),
//!     temperature: None,
//! };
//! let client = build_client(&cfg)?;
//! assert_eq!(client.model_name(), "gemini-2.5-flash");
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod openai;
mod sse;
pub mod traits;

use brochure_common::LlmConfig;
use gemini::GeminiClient;
use openai::OpenAiCompatClient;
use std::sync::Arc;
use traits::LlmClient;

pub use traits::{CompletionOptions, CompletionStream, LlmResponse};

/// Build the process-wide completion client described by `config`.
///
/// The client is read-only after construction; share the returned `Arc`.
pub fn build_client(
    config: &LlmConfig,
) -> brochure_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    config.validate()?;
    tracing::info!(
        provider = config.provider_name(),
        model = config.model(),
        "initializing LLM client"
    );

    match config {
        LlmConfig::OpenAi {
            api_key,
            model,
            endpoint,
            temperature,
        } => {
            let client = OpenAiCompatClient::new(api_key.clone(), model.clone(), endpoint)?
                .with_temperature(*temperature);
            Ok(Arc::new(client))
        }
        LlmConfig::Gemini {
            api_key,
            model,
            temperature,
        } => {
            let client =
                GeminiClient::new(api_key.clone(), model.clone())?.with_temperature(*temperature);
            Ok(Arc::new(client))
        }
    }
}
