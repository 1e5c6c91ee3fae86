use crate::sse::data_payloads;
use crate::traits::{CompletionOptions, CompletionStream, LlmClient, LlmResponse};
use async_trait::async_trait;
use brochure_common::{BrochureError, Result};
use brochure_http::{Auth, HttpClient, HttpError, RequestOpts};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    system_instruction: Turn<'a>,
    contents: [Turn<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Turn<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [TextPart<'a>; 1],
}

impl<'a> Turn<'a> {
    fn new(role: Option<&'static str>, text: &'a str) -> Self {
        Self {
            role,
            parts: [TextPart { text }],
        }
    }
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// One `generateContent` reply, or one SSE chunk of `streamGenerateContent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Generated {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<Usage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    total_token_count: Option<u32>,
}

impl Generated {
    /// Concatenated parts of the first candidate. Safety blocks are errors;
    /// a reply without candidates yields empty text.
    fn first_text(&self) -> Result<String> {
        let Some(candidate) = self.candidates.first() else {
            return Ok(String::new());
        };
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(BrochureError::Llm(
                "Content blocked by Gemini safety filters".to_string(),
            ));
        }
        Ok(candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect())
    }
}

/// Google Gemini API client.
///
/// Requires a valid API key and internet access.
pub struct GeminiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL)
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Result<Self> {
        let client = HttpClient::new(base_url)
            .map_err(|e| BrochureError::Llm(format!("Failed to create HTTP client: {e}")))?
            .without_timeout();

        Ok(Self {
            client,
            api_key,
            model,
            temperature: None,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn body<'a>(
        &self,
        system_prompt: &'a str,
        user_prompt: &'a str,
        opts: CompletionOptions,
    ) -> GenerateBody<'a> {
        let temperature = opts.temperature.or(self.temperature);
        let tuned = opts.json_mode || opts.max_tokens.is_some() || temperature.is_some();

        GenerateBody {
            system_instruction: Turn::new(None, system_prompt),
            contents: [Turn::new(Some("user"), user_prompt)],
            generation_config: tuned.then(|| GenerationConfig {
                temperature,
                max_output_tokens: opts.max_tokens,
                response_mime_type: opts.json_mode.then_some("application/json"),
            }),
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        }
    }

    fn opts<'a>(&'a self, extra_query: Option<(&'a str, &'a str)>) -> RequestOpts<'a> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(&self.api_key),
            }),
            query: extra_query.map(|(k, v)| vec![(k, Cow::Borrowed(v))]),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<LlmResponse> {
        let path = format!("models/{}:generateContent", self.model);
        let body = self.body(system_prompt, user_prompt, opts);
        tracing::debug!(model = %self.model, json_mode = opts.json_mode, "llm.complete");

        let reply: Generated = self
            .client
            .post_json_opts(&path, &body, self.opts(None))
            .await
            .map_err(gemini_error)?;
        if reply.candidates.is_empty() {
            return Err(BrochureError::Llm(
                "No candidates returned from Gemini".to_string(),
            ));
        }

        Ok(LlmResponse {
            text: reply.first_text()?,
            tokens_used: reply.usage_metadata.and_then(|u| u.total_token_count),
            model: reply.model_version.or_else(|| Some(self.model.clone())),
        })
    }

    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<CompletionStream> {
        let path = format!("models/{}:streamGenerateContent", self.model);
        let body = self.body(system_prompt, user_prompt, opts);
        tracing::debug!(model = %self.model, json_mode = opts.json_mode, "llm.complete_stream");

        let bytes = self
            .client
            .post_stream(&path, &body, self.opts(Some(("alt", "sse"))))
            .await
            .map_err(gemini_error)?;

        let mut payloads = data_payloads(bytes);
        let stream = async_stream::stream! {
            while let Some(payload) = payloads.next().await {
                let chunk = payload.and_then(|p| {
                    serde_json::from_str::<Generated>(&p).map_err(|e| {
                        BrochureError::Llm(format!("malformed Gemini stream chunk: {e}"))
                    })
                });
                match chunk.and_then(|c| c.first_text()) {
                    Ok(text) if text.is_empty() => {}
                    Ok(text) => yield Ok(text),
                    Err(e) => {
                        yield Err(e);
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

fn gemini_error(e: HttpError) -> BrochureError {
    let message = match &e {
        HttpError::Api { status, .. } => match status.as_u16() {
            401 => "Invalid API key".to_string(),
            403 => "API access forbidden".to_string(),
            429 => "Rate limit exceeded".to_string(),
            _ => format!("Gemini request failed: {e}"),
        },
        _ => format!("Gemini request failed: {e}"),
    };
    BrochureError::Llm(message)
}
