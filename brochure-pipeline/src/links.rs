use crate::prompts::{link_user_prompt, LINK_SYSTEM_PROMPT};
use brochure_common::text::truncate_chars;
use brochure_common::{BrochureError, Result};
use brochure_llm::traits::LlmClient;
use brochure_llm::CompletionOptions;
use brochure_web::PageFetcher;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// A link the model judged useful for the brochure.
///
/// `url` is asked for as an absolute https URL but never checked; relative or
/// malformed values pass through and fail later at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Deserialize)]
struct LinkSelection {
    links: Vec<RelevantLink>,
}

/// Asks the model which of a page's links belong in a brochure.
#[derive(Clone)]
pub struct LinkSelector {
    llm: Arc<dyn LlmClient + Send + Sync>,
    fetcher: Arc<dyn PageFetcher + Send + Sync>,
}

impl LinkSelector {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        fetcher: Arc<dyn PageFetcher + Send + Sync>,
    ) -> Self {
        Self { llm, fetcher }
    }

    /// Fetch the link list of `url`, then run selection over it.
    pub async fn select_relevant_links(&self, url: &str) -> Result<Vec<RelevantLink>> {
        let links = self.fetcher.fetch_links(url).await?;
        self.select_from_links(url, &links).await
    }

    /// Run selection over an already fetched link list.
    pub async fn select_from_links(
        &self,
        url: &str,
        links: &[String],
    ) -> Result<Vec<RelevantLink>> {
        debug!(%url, candidates = links.len(), "selecting relevant links");
        let prompt = link_user_prompt(url, links);
        let response = self
            .llm
            .complete(LINK_SYSTEM_PROMPT, &prompt, CompletionOptions::json())
            .await?;

        let selected = decode_selection(&response.text)?;
        info!(
            %url,
            candidates = links.len(),
            selected = selected.len(),
            tokens = response.tokens_used,
            "relevant links selected"
        );
        Ok(selected)
    }
}

/// Decode the model's `{"links": [{"type", "url"}, ...]}` answer.
///
/// A surrounding ```json fence is tolerated. Anything else that is not that
/// exact shape is a [`BrochureError::SelectionParse`].
pub fn decode_selection(text: &str) -> Result<Vec<RelevantLink>> {
    let body = strip_fence(text);
    serde_json::from_str::<LinkSelection>(body)
        .map(|s| s.links)
        .map_err(|e| {
            BrochureError::SelectionParse(format!(
                "{e} (output: {:?})",
                truncate_chars(text.trim(), 200)
            ))
        })
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid regex")
    })
}

fn strip_fence(text: &str) -> &str {
    fence_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_pattern_is_compiled_once() {
        assert!(std::ptr::eq(fence_pattern(), fence_pattern()));
        assert_eq!(strip_fence("```json\n{\"links\":[]}\n```"), "{\"links\":[]}");
        assert_eq!(strip_fence("no fence"), "no fence");
    }

    #[test]
    fn decodes_plain_object() {
        let links = decode_selection(
            r#"{"links": [
                {"type": "about page", "url": "https://acme.test/about"},
                {"type": "careers page", "url": "/careers"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            links,
            vec![
                RelevantLink {
                    kind: "about page".into(),
                    url: "https://acme.test/about".into()
                },
                RelevantLink {
                    kind: "careers page".into(),
                    url: "/careers".into()
                },
            ]
        );
    }

    #[test]
    fn decodes_fenced_object() {
        let text = "```json\n{\"links\": [{\"type\": \"about page\", \"url\": \"https://a.test/about\"}]}\n```\n";
        let links = decode_selection(text).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, "about page");
    }

    #[test]
    fn empty_selection_is_valid() {
        assert!(decode_selection(r#"{"links": []}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_wrong_shapes() {
        for bad in [
            "not json at all",
            r#"{"urls": []}"#,
            r#"{"links": [{"type": "about page"}]}"#,
            r#"{"links": [{"type": 3, "url": "https://a.test"}]}"#,
            r#"[{"type": "about page", "url": "https://a.test"}]"#,
            "",
        ] {
            let err = decode_selection(bad).unwrap_err();
            assert!(
                matches!(err, BrochureError::SelectionParse(_)),
                "{bad:?} gave {err}"
            );
        }
    }

    #[test]
    fn type_field_serializes_under_its_wire_name() {
        let link = RelevantLink {
            kind: "about page".into(),
            url: "https://a.test".into(),
        };
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["type"], "about page");
    }
}
