use crate::links::{LinkSelector, RelevantLink};
use crate::prompts::brochure_user_prompt;
use brochure_common::Result;
use brochure_llm::traits::LlmClient;
use brochure_web::PageFetcher;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LANDING_HEADER: &str = "## Landing Page:";
pub const LINKS_HEADER: &str = "## Relevant Links:";
pub const UNAVAILABLE_NOTE: &str = "(Could not fetch this link)";

/// Outcome of fetching one relevant link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkContent {
    Fetched(String),
    /// The fetch failed; the reason is logged, never rendered.
    Unavailable(String),
}

/// Builds the combined landing-page + relevant-pages document.
#[derive(Clone)]
pub struct ContentAggregator {
    fetcher: Arc<dyn PageFetcher + Send + Sync>,
    selector: LinkSelector,
}

impl ContentAggregator {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        fetcher: Arc<dyn PageFetcher + Send + Sync>,
    ) -> Self {
        let selector = LinkSelector::new(llm, Arc::clone(&fetcher));
        Self { fetcher, selector }
    }

    /// The full brochure user prompt for `company_name`, capped at
    /// [`crate::prompts::PROMPT_LIMIT`] characters.
    pub async fn build_brochure_context(&self, company_name: &str, url: &str) -> Result<String> {
        let document = self.aggregate(url).await?;
        Ok(brochure_user_prompt(company_name, &document))
    }

    /// Landing page plus one section per relevant link, untruncated.
    ///
    /// The landing page is downloaded once and feeds both its own section and
    /// link selection. A failure there, or in selection, fails the whole call.
    /// Failures on individual relevant links are absorbed into their section.
    pub async fn aggregate(&self, url: &str) -> Result<String> {
        let landing = self.fetcher.fetch_page(url).await?;
        let links = self.selector.select_from_links(url, &landing.links).await?;

        let mut sections = Vec::with_capacity(links.len());
        for link in links {
            let content = self.fetch_link(&link).await;
            sections.push((link, content));
        }

        let unavailable = sections
            .iter()
            .filter(|(_, c)| matches!(c, LinkContent::Unavailable(_)))
            .count();
        info!(%url, sections = sections.len(), unavailable, "brochure context assembled");

        Ok(render_document(&landing.contents.into_text(), &sections))
    }

    async fn fetch_link(&self, link: &RelevantLink) -> LinkContent {
        match self.fetcher.fetch_contents(&link.url).await {
            Ok(page) => {
                debug!(kind = %link.kind, url = %link.url, "relevant link fetched");
                LinkContent::Fetched(page.into_text())
            }
            Err(e) => {
                warn!(kind = %link.kind, url = %link.url, error = %e, "skipping relevant link");
                LinkContent::Unavailable(e.to_string())
            }
        }
    }
}

/// Lay out the aggregated document. Every link gets a heading, fetched or not.
pub fn render_document(landing: &str, sections: &[(RelevantLink, LinkContent)]) -> String {
    let mut out = format!("{LANDING_HEADER}\n\n{landing}\n{LINKS_HEADER}\n");
    for (link, content) in sections {
        out.push_str("\n\n### Link: ");
        out.push_str(&link.kind);
        out.push('\n');
        match content {
            LinkContent::Fetched(text) => out.push_str(text),
            LinkContent::Unavailable(_) => {
                out.push_str("\n\n");
                out.push_str(UNAVAILABLE_NOTE);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(kind: &str) -> RelevantLink {
        RelevantLink {
            kind: kind.into(),
            url: format!("https://acme.test/{}", kind.replace(' ', "-")),
        }
    }

    #[test]
    fn renders_sections_in_order() {
        let doc = render_document(
            "Acme\n\nWelcome",
            &[
                (link("about page"), LinkContent::Fetched("About\n\nus".into())),
                (link("careers page"), LinkContent::Fetched("Jobs\n\nhiring".into())),
            ],
        );
        assert_eq!(
            doc,
            "## Landing Page:\n\nAcme\n\nWelcome\n## Relevant Links:\n\
             \n\n### Link: about page\nAbout\n\nus\
             \n\n### Link: careers page\nJobs\n\nhiring"
        );
    }

    #[test]
    fn failed_link_keeps_heading_with_placeholder() {
        let doc = render_document(
            "L",
            &[(
                link("blog"),
                LinkContent::Unavailable("Failed to fetch x: timeout".into()),
            )],
        );
        assert!(doc.ends_with("\n\n### Link: blog\n\n\n(Could not fetch this link)\n"));
        assert!(!doc.contains("timeout"));
    }

    #[test]
    fn no_links_leaves_empty_section() {
        assert_eq!(
            render_document("L", &[]),
            "## Landing Page:\n\nL\n## Relevant Links:\n"
        );
    }
}
