// src/pipeline/analyze.rs

//! Enrichment pipeline.

use std::time::Instant;

use crate::error::Result;
use crate::models::Config;
use crate::services::{ChatClassifier, EnrichReport, EnrichSettings, Enricher};
use crate::storage::PostStore;

/// Enrich up to `limit` pending posts (all of them when `None`).
pub async fn run_analysis(
    config: &Config,
    store: &dyn PostStore,
    limit: Option<usize>,
) -> Result<EnrichReport> {
    let started = Instant::now();
    let classifier = ChatClassifier::new(config.llm.clone())?;
    let settings = EnrichSettings::from_config(config, limit);

    let report = Enricher::new(settings, &classifier, store).run().await;

    log::info!(
        "Analysis finished in {:.1}s: {} candidate(s), {} enriched, {} classifier failure(s), {} unparseable, {} store failure(s)",
        started.elapsed().as_secs_f64(),
        report.candidates,
        report.enriched,
        report.classify_failures,
        report.parse_failures,
        report.store_failures
    );

    Ok(report)
}
