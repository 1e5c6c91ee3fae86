use crate::aggregate::ContentAggregator;
use crate::synth::{BrochureSynthesizer, FrameStream};
use brochure_common::Result;
use brochure_llm::traits::LlmClient;
use brochure_web::PageFetcher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// The one external input: which company, and where its site lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrochureRequest {
    pub company_name: String,
    pub url: String,
}

/// End-to-end brochure generation over injected fetch and completion clients.
///
/// Cheap to clone; every request runs independently against the shared,
/// read-only clients.
#[derive(Clone)]
pub struct BrochureService {
    aggregator: ContentAggregator,
    synthesizer: BrochureSynthesizer,
}

impl BrochureService {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        fetcher: Arc<dyn PageFetcher + Send + Sync>,
    ) -> Self {
        Self {
            aggregator: ContentAggregator::new(Arc::clone(&llm), fetcher),
            synthesizer: BrochureSynthesizer::new(llm),
        }
    }

    /// Aggregate the site, then synthesize the whole brochure in one call.
    pub async fn generate_brochure(&self, request: &BrochureRequest) -> Result<String> {
        let span = request_span(request, "whole");
        async {
            info!("brochure requested");
            let prompt = self
                .aggregator
                .build_brochure_context(&request.company_name, &request.url)
                .await?;
            self.synthesizer.generate(&prompt).await
        }
        .instrument(span)
        .await
    }

    /// Aggregate the site, then hand back a lazy frame stream.
    ///
    /// Aggregation errors are returned here, before any frame exists;
    /// synthesis errors arrive in-band as the stream's last frame.
    pub async fn generate_brochure_stream(
        &self,
        request: &BrochureRequest,
    ) -> Result<FrameStream> {
        let span = request_span(request, "stream");
        let prompt = async {
            info!("brochure requested");
            self.aggregator
                .build_brochure_context(&request.company_name, &request.url)
                .await
        }
        .instrument(span.clone())
        .await?;
        Ok(self.synthesizer.generate_stream(prompt, span))
    }
}

fn request_span(request: &BrochureRequest, mode: &'static str) -> tracing::Span {
    info_span!(
        "brochure",
        request_id = %Uuid::new_v4().simple(),
        company = %request.company_name,
        url = %request.url,
        mode
    )
}
