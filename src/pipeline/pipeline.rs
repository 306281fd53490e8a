// src/pipeline/pipeline.rs

use serde::Serialize;

use crate::error::Result;
use crate::models::Config;
use crate::services::{CrawlReport, EnrichReport};
use crate::storage::PostStore;

use super::analyze::run_analysis;
use super::crawl::{CrawlOptions, run_crawler};

/// Outcome of a crawl-then-analyze run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub crawl: CrawlReport,
    /// `None` when the crawl failed and analysis was skipped
    pub enrich: Option<EnrichReport>,
}

impl PipelineReport {
    /// The crawl finished and the analysis enriched something, or had nothing to do.
    pub fn is_success(&self) -> bool {
        self.crawl.is_success() && self.enrich.as_ref().is_some_and(EnrichReport::is_success)
    }
}

/// Run the full pipeline.
pub async fn run_pipeline(
    config: &Config,
    store: &dyn PostStore,
    crawl: &CrawlOptions,
    analyze_limit: Option<usize>,
) -> Result<PipelineReport> {
    log::info!("[1/2] Crawl - Fetching posts");
    let crawl = run_crawler(config, store, crawl).await?;

    if !crawl.is_success() {
        log::error!("Crawl did not complete; skipping analysis");
        return Ok(PipelineReport {
            crawl,
            enrich: None,
        });
    }

    log::info!("[2/2] Analyze - Enriching posts");
    let enrich = run_analysis(config, store, analyze_limit).await?;

    Ok(PipelineReport {
        crawl,
        enrich: Some(enrich),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CrawlState;

    fn crawl(state: CrawlState) -> CrawlReport {
        CrawlReport {
            state,
            pages_fetched: 1,
            posts_processed: 3,
            inserted: 3,
            duplicates: 0,
            store_failures: 0,
            fetch_failures: 0,
            last_cursor: Some("97".to_string()),
            error: None,
        }
    }

    #[test]
    fn run_fails_when_every_candidate_fails_enrichment() {
        let report = PipelineReport {
            crawl: crawl(CrawlState::Done),
            enrich: Some(EnrichReport {
                candidates: 3,
                classify_failures: 3,
                ..EnrichReport::default()
            }),
        };
        assert!(!report.is_success());
    }

    #[test]
    fn run_succeeds_with_any_enrichment_or_nothing_pending() {
        let partial = PipelineReport {
            crawl: crawl(CrawlState::Done),
            enrich: Some(EnrichReport {
                candidates: 3,
                enriched: 1,
                parse_failures: 2,
                ..EnrichReport::default()
            }),
        };
        assert!(partial.is_success());

        let idle = PipelineReport {
            crawl: crawl(CrawlState::Done),
            enrich: Some(EnrichReport::default()),
        };
        assert!(idle.is_success());
    }

    #[test]
    fn failed_crawl_fails_run() {
        let report = PipelineReport {
            crawl: crawl(CrawlState::Failed),
            enrich: None,
        };
        assert!(!report.is_success());
    }
}
