//! Brochure pipeline: fetch → select links → fetch again → synthesize.
//!
//! - [`LinkSelector`]: model-driven choice of relevant links
//! - [`ContentAggregator`]: landing page plus relevant pages in one document
//! - [`BrochureSynthesizer`]: whole or streamed brochure text
//! - [`BrochureService`]: the two request-level entry points
//!
//! Every component takes its completion and fetch clients as `Arc`s, so tests
//! substitute in-process fakes for both.

pub mod aggregate;
pub mod links;
pub mod prompts;
pub mod service;
pub mod synth;

pub use aggregate::{render_document, ContentAggregator, LinkContent};
pub use links::{decode_selection, LinkSelector, RelevantLink};
pub use prompts::PROMPT_LIMIT;
pub use service::{BrochureRequest, BrochureService};
pub use synth::{BrochureFrame, BrochureSynthesizer, FrameStream};
