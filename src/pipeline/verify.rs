// src/pipeline/verify.rs

use crate::error::Result;
use crate::models::{Config, StoreStats};
use crate::storage::PostStore;

/// Validate configuration and report store counts.
pub fn run_verify(config: &Config, store: &dyn PostStore) -> Result<StoreStats> {
    log::info!("Verifying configuration and store");

    config.validate()?;
    log::info!("Configuration OK");
    log::info!("  Feed: {} (forum '{}')", config.feed.base_url, config.feed.forum);
    log::info!(
        "  Budget: {} post(s), {} per page, {}ms delay",
        config.feed.total_posts,
        config.feed.page_size,
        config.feed.request_delay_ms
    );
    log::info!("  Session mode: {:?}", config.session.mode);
    log::info!("  Classifier: {} ({})", config.llm.endpoint, config.llm.model);
    if config.llm.api_key.is_none() {
        log::warn!("  No API key configured; analysis will fail");
    }

    let stats = store.stats()?;
    log::info!(
        "Store OK: {} post(s), {} enriched, {} pending",
        stats.total,
        stats.enriched,
        stats.pending
    );

    Ok(stats)
}
