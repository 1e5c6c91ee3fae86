#![allow(dead_code)]

use async_trait::async_trait;
use brochure_common::{BrochureError, Result};
use brochure_llm::traits::LlmClient;
use brochure_llm::{CompletionOptions, CompletionStream, LlmResponse};
use brochure_pipeline::prompts::LINK_SYSTEM_PROMPT;
use brochure_web::PageFetcher;
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SITE: &str = "https://example.com";

/// Serves canned HTML per URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrochureError::fetch(url, "HTTP 404 Not Found"))
    }
}

/// Answers link selection with a fixed reply and synthesis with fixed chunks.
pub struct ScriptedLlm {
    link_reply: String,
    chunks: Vec<String>,
    stream_failure: Option<String>,
    pub selection_calls: AtomicUsize,
    pub synthesis_calls: AtomicUsize,
    pub brochure_prompts: Mutex<Vec<String>>,
    pub selection_opts: Mutex<Vec<CompletionOptions>>,
}

impl ScriptedLlm {
    pub fn new(link_reply: &str, chunks: &[&str]) -> Self {
        Self {
            link_reply: link_reply.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            stream_failure: None,
            selection_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            brochure_prompts: Mutex::new(Vec::new()),
            selection_opts: Mutex::new(Vec::new()),
        }
    }

    /// After the scripted chunks, the stream yields this error instead of ending.
    pub fn failing_after_chunks(mut self, message: &str) -> Self {
        self.stream_failure = Some(message.to_string());
        self
    }

    pub fn selections(&self) -> usize {
        self.selection_calls.load(Ordering::SeqCst)
    }

    pub fn syntheses(&self) -> usize {
        self.synthesis_calls.load(Ordering::SeqCst)
    }

    pub fn last_brochure_prompt(&self) -> String {
        self.brochure_prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        opts: CompletionOptions,
    ) -> Result<LlmResponse> {
        if system_prompt == LINK_SYSTEM_PROMPT {
            self.selection_calls.fetch_add(1, Ordering::SeqCst);
            self.selection_opts.lock().unwrap().push(opts);
            return Ok(LlmResponse {
                text: self.link_reply.clone(),
                model: Some("scripted".into()),
                tokens_used: None,
            });
        }

        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        self.brochure_prompts
            .lock()
            .unwrap()
            .push(user_prompt.to_string());
        if let Some(message) = &self.stream_failure {
            return Err(BrochureError::Llm(message.clone()));
        }
        Ok(LlmResponse {
            text: self.chunks.concat(),
            model: Some("scripted".into()),
            tokens_used: Some(self.chunks.len() as u32),
        })
    }

    async fn complete_stream(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _opts: CompletionOptions,
    ) -> Result<CompletionStream> {
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        self.brochure_prompts
            .lock()
            .unwrap()
            .push(user_prompt.to_string());

        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_failure {
            items.push(Err(BrochureError::Llm(message.clone())));
        }
        Ok(Box::pin(stream::iter(items)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A landing page linking to `/about` and `/careers`.
pub fn landing_html() -> String {
    r#"<html><head><title>Acme Corp</title></head>
    <body>
      <a href="/about">About</a>
      <a href="/careers">Careers</a>
      <a href="/privacy">Privacy</a>
      <p>We make everything.</p>
    </body></html>"#
        .to_string()
}

pub fn page_html(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body><p>{body}</p></body></html>")
}

pub const ABOUT_AND_CAREERS: &str = r#"{"links": [
    {"type": "about page", "url": "https://example.com/about"},
    {"type": "careers page", "url": "https://example.com/careers"}
]}"#;
