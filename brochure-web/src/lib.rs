//! Page acquisition and HTML extraction.
//!
//! - [`PageFetcher`]: the fetch capability, with one required I/O method
//! - [`HttpPageFetcher`]: reqwest-backed implementation (single GET, fixed timeout)
//! - [`extract`]: pure HTML → [`FetchResult`] / link-list extraction

pub mod extract;
pub mod fetcher;

pub use extract::{extract_contents, extract_links, FetchResult, CONTENT_LIMIT, NO_TITLE};
pub use fetcher::{HttpPageFetcher, PageFetcher, PageSnapshot};
