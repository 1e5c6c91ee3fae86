use crate::extract::{extract_contents, extract_links, FetchResult};
use async_trait::async_trait;
use brochure_common::{BrochureError, Result};
use brochure_http::{HttpClient, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, warn};

/// Extracted contents and raw links of one page, from a single download.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub contents: FetchResult,
    pub links: Vec<String>,
}

/// Retrieves web pages by URL.
///
/// Implementors supply only [`PageFetcher::fetch_html`]; the extraction
/// methods are provided on top of it so test doubles can serve canned HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Download `url` and return the response body as text.
    ///
    /// Any network failure, timeout, or non-2xx status is a
    /// [`BrochureError::Fetch`].
    async fn fetch_html(&self, url: &str) -> Result<String>;

    /// Title and visible body text of `url`.
    async fn fetch_contents(&self, url: &str) -> Result<FetchResult> {
        let html = self.fetch_html(url).await?;
        Ok(extract_contents(&html))
    }

    /// Raw `href` values of every anchor on `url`.
    async fn fetch_links(&self, url: &str) -> Result<Vec<String>> {
        let html = self.fetch_html(url).await?;
        Ok(extract_links(&html))
    }

    /// Contents and links of `url` from one download.
    async fn fetch_page(&self, url: &str) -> Result<PageSnapshot> {
        let html = self.fetch_html(url).await?;
        Ok(PageSnapshot {
            contents: extract_contents(&html),
            links: extract_links(&html),
        })
    }
}

/// [`PageFetcher`] over plain HTTP GET with a browser-like User-Agent.
///
/// One attempt per URL, bounded by a fixed timeout. Redirects are followed.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: HttpClient,
    timeout: Duration,
    headers: HeaderMap,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = HttpClient::unanchored()
            .map_err(|e| BrochureError::Config(format!("http client: {e}")))?
            .with_timeout(timeout)
            .with_retries(0);
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| BrochureError::Config(format!("invalid user agent: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, agent);
        Ok(Self {
            client,
            timeout,
            headers,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!(%url, "fetching page");
        let opts = RequestOpts {
            timeout: Some(self.timeout),
            retries: Some(0),
            headers: Some(self.headers.clone()),
            ..Default::default()
        };
        match self.client.get_text(url, opts).await {
            Ok(body) => {
                debug!(%url, bytes = body.len(), "page fetched");
                Ok(body)
            }
            Err(e) => {
                warn!(%url, error = %e, "page fetch failed");
                Err(BrochureError::fetch(url, e))
            }
        }
    }
}
