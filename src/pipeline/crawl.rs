// src/pipeline/crawl.rs

//! Post crawling pipeline.

use std::time::Instant;

use crate::error::Result;
use crate::models::Config;
use crate::services::{
    CrawlReport, CrawlSettings, HttpFeedTransport, PostCrawler, bootstrapper_from_config,
};
use crate::storage::PostStore;
use crate::utils::http::create_async_client;

/// Per-run overrides for the `[feed]` section.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub forum: Option<String>,
    pub limit: Option<usize>,
}

/// Run the post crawler against the configured feed.
pub async fn run_crawler(
    config: &Config,
    store: &dyn PostStore,
    options: &CrawlOptions,
) -> Result<CrawlReport> {
    let started = Instant::now();
    let settings = CrawlSettings::from(&config.feed)
        .with_forum(options.forum.clone())
        .with_total_posts(options.limit);

    log::info!("Crawler starting for forum '{}'", settings.forum);

    let client = create_async_client(&config.feed)?;
    let bootstrapper = bootstrapper_from_config(config, client.clone());
    let transport = HttpFeedTransport::new(client, &config.feed.base_url)?;

    let report = PostCrawler::new(settings, bootstrapper.as_ref(), &transport, store)
        .run()
        .await;

    log::info!(
        "Crawl {:?} in {:.1}s: {} page(s), {} post(s), {} new, {} duplicate, {} store failure(s), {} fetch failure(s)",
        report.state,
        started.elapsed().as_secs_f64(),
        report.pages_fetched,
        report.posts_processed,
        report.inserted,
        report.duplicates,
        report.store_failures,
        report.fetch_failures
    );
    if let Some(cursor) = &report.last_cursor {
        log::debug!("Last cursor: {}", cursor);
    }

    Ok(report)
}
