use crate::prompts::BROCHURE_SYSTEM_PROMPT;
use async_stream::stream;
use brochure_common::{BrochureError, Result};
use brochure_llm::traits::LlmClient;
use brochure_llm::CompletionOptions;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument, Span};

/// One element of a streamed brochure.
///
/// A stream is zero or more `Content` frames closed by exactly one `Done` or
/// exactly one `Error`; nothing follows either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrochureFrame {
    Content(String),
    Error(String),
    Done,
}

pub type FrameStream = BoxStream<'static, BrochureFrame>;

/// Turns a brochure user prompt into markdown.
#[derive(Clone)]
pub struct BrochureSynthesizer {
    llm: Arc<dyn LlmClient + Send + Sync>,
}

impl BrochureSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .llm
            .complete(BROCHURE_SYSTEM_PROMPT, prompt, CompletionOptions::default())
            .await
            .map_err(|e| BrochureError::Synthesis(e.to_string()))?;
        info!(
            model = response.model.as_deref().unwrap_or(self.llm.model_name()),
            tokens = response.tokens_used,
            chars = response.text.chars().count(),
            "brochure generated"
        );
        Ok(response.text)
    }

    /// Lazily stream the brochure. Nothing is sent upstream until the first poll.
    ///
    /// Upstream failures, before or during delivery, become a final
    /// [`BrochureFrame::Error`] instead of an `Err`. Events emitted while the
    /// stream is polled belong to `span`.
    pub fn generate_stream(&self, prompt: String, span: Span) -> FrameStream {
        let llm = Arc::clone(&self.llm);
        Box::pin(stream! {
            let started = llm
                .complete_stream(BROCHURE_SYSTEM_PROMPT, &prompt, CompletionOptions::default())
                .instrument(span.clone())
                .await;
            let mut chunks = match started {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(parent: &span, error = %e, "brochure stream failed to start");
                    yield BrochureFrame::Error(BrochureError::Synthesis(e.to_string()).to_string());
                    return;
                }
            };

            let mut frames = 0usize;
            while let Some(chunk) = chunks.next().instrument(span.clone()).await {
                match chunk {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => {
                        frames += 1;
                        yield BrochureFrame::Content(text);
                    }
                    Err(e) => {
                        warn!(parent: &span, error = %e, frames, "brochure stream aborted");
                        yield BrochureFrame::Error(BrochureError::Synthesis(e.to_string()).to_string());
                        return;
                    }
                }
            }

            debug!(parent: &span, frames, "brochure stream complete");
            yield BrochureFrame::Done;
        })
    }
}
