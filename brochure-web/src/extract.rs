//! HTML → text and HTML → link-list extraction.
//!
//! Both functions are pure and never fail: the HTML5 parser recovers from any
//! malformed input the same way a browser would.

use brochure_common::text::truncate_owned;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// Hard cap on the rendered page text, in characters.
pub const CONTENT_LIMIT: usize = 2_000;

/// Title used when a page has no (or an empty) `<title>`.
pub const NO_TITLE: &str = "No title found";

/// Elements whose content never counts as visible text.
const EXCLUDED: [&str; 4] = ["script", "style", "img", "input"];

/// What one page fetch yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub title: String,
    /// Visible body text, one trimmed segment per line.
    pub body_text: String,
}

impl FetchResult {
    /// `title + "\n\n" + body_text`, cut to [`CONTENT_LIMIT`] characters.
    ///
    /// The cut is a size bound only; it may land mid-word.
    pub fn into_text(self) -> String {
        let mut out = self.title;
        out.reserve(2 + self.body_text.len());
        out.push_str("\n\n");
        out.push_str(&self.body_text);
        truncate_owned(out, CONTENT_LIMIT)
    }
}

/// Parse `html` and pull out its title and visible body text.
///
/// ```
/// use brochure_web::extract_contents;
///
/// let page = extract_contents(
///     "<html><head><title>Acme</title></head>\
///      <body><h1>Welcome</h1><script>track()</script><p>We build rockets.</p></body></html>",
/// );
/// assert_eq!(page.title, "Acme");
/// assert_eq!(page.body_text, "Welcome\nWe build rockets.");
/// ```
pub fn extract_contents(html: &str) -> FetchResult {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = elements(root, "title")
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let body_text = elements(root, "body")
        .next()
        .map(visible_text)
        .unwrap_or_default();

    FetchResult { title, body_text }
}

/// Every non-empty `href` of every `<a>` element, in document order.
///
/// Nothing is resolved, normalized, deduplicated, or filtered: relative
/// paths, fragments, and `mailto:` links all come back verbatim.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    elements(document.root_element(), "a")
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

fn elements<'a>(root: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn visible_text(body: ElementRef<'_>) -> String {
    body.descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| EXCLUDED.contains(&el.name()))
            })
        })
        .map(|(_, text)| text.trim())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
