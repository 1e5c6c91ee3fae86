use async_trait::async_trait;
use brochure_common::Result;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// Per-call knobs for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    /// Ask the provider for a single valid JSON object.
    pub json_mode: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Structured-output mode.
    pub fn json() -> Self {
        Self {
            json_mode: true,
            ..Self::default()
        }
    }
}

/// Live sequence of text fragments in the order the model emits them.
///
/// An `Err` item means the upstream call failed mid-stream; nothing follows it.
pub type CompletionStream = BoxStream<'static, Result<String>>;

/// The text-completion capability every provider implements.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion and return the whole response.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<LlmResponse>;

    /// Run one completion in incremental-delivery mode.
    ///
    /// Errors raised before the first byte arrives are returned directly;
    /// later failures surface as an `Err` item in the stream.
    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<CompletionStream>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
