pub mod server;

use anyhow::Result;
use brochure_common::observability::LogConfig;
use brochure_config::BrochureConfig;
use brochure_pipeline::BrochureService;
use brochure_web::HttpPageFetcher;
use std::sync::Arc;

/// Wire the completion client and page fetcher described by `cfg`.
pub fn build_service(cfg: &BrochureConfig) -> Result<BrochureService> {
    let llm = brochure_llm::build_client(&cfg.llm)?;
    let fetcher = HttpPageFetcher::new(cfg.fetch.timeout(), &cfg.fetch.user_agent)?;
    Ok(BrochureService::new(llm, Arc::new(fetcher)))
}

pub fn log_config(cfg: &BrochureConfig) -> LogConfig {
    LogConfig {
        app_name: "brochure",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    }
}
