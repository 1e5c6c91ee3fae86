use crate::sse::data_payloads;
use crate::traits::{CompletionOptions, CompletionStream, LlmClient, LlmResponse};
use async_trait::async_trait;
use brochure_common::{BrochureError, Result};
use brochure_http::{Auth, HttpClient, HttpError, RequestOpts};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

const STREAM_DONE: &str = "[DONE]";

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
///
/// The default configuration points it at Gemini's OpenAI-compatible surface.
pub struct OpenAiCompatClient {
    client: HttpClient,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u32>,
}

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

impl OpenAiCompatClient {
    /// Create a client for `endpoint` (e.g. `https://api.openai.com/v1/`).
    ///
    /// Only the connect timeout applies; a completion may take as long as the
    /// provider needs.
    pub fn new(api_key: String, model: String, endpoint: &str) -> Result<Self> {
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let client = HttpClient::new(&endpoint)
            .map_err(|e| BrochureError::Llm(format!("HttpClient init failed: {e}")))?
            .without_timeout();

        Ok(Self {
            client,
            api_key,
            model,
            temperature: None,
        })
    }

    /// Default sampling temperature used when a call does not set one.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn request<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
        opts: CompletionOptions,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: opts.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
            temperature: opts.temperature.or(self.temperature),
            max_tokens: opts.max_tokens,
        }
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Bearer(&self.api_key)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<LlmResponse> {
        let req = self.request(system_prompt, user_prompt, opts, false);
        tracing::debug!(model = %self.model, json_mode = opts.json_mode, "llm.complete");

        let resp: ChatResponse = self
            .client
            .post_json_opts("chat/completions", &req, self.opts())
            .await
            .map_err(http_to_llm)?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BrochureError::Llm("completion returned no choices".into()))?;

        Ok(LlmResponse {
            text,
            model: resp.model.or_else(|| Some(self.model.clone())),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<CompletionStream> {
        let req = self.request(system_prompt, user_prompt, opts, true);
        tracing::debug!(model = %self.model, json_mode = opts.json_mode, "llm.complete_stream");

        let body = self
            .client
            .post_stream("chat/completions", &req, self.opts())
            .await
            .map_err(http_to_llm)?;

        let mut payloads = data_payloads(body);
        let stream = async_stream::stream! {
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(p) => p,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if payload.trim() == STREAM_DONE {
                    return;
                }
                match serde_json::from_str::<ChatChunk>(&payload) {
                    Ok(ChatChunk { error: Some(err), .. }) => {
                        yield Err(BrochureError::Llm(err.message));
                        return;
                    }
                    Ok(chunk) => {
                        let text: String = chunk
                            .choices
                            .into_iter()
                            .filter_map(|c| c.delta.content)
                            .collect();
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(BrochureError::Llm(format!("malformed stream chunk: {e}")));
                        return;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_llm(e: HttpError) -> BrochureError {
    BrochureError::Llm(format!("{e}"))
}
