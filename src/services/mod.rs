//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Session bootstrap (`SessionBootstrapper`)
//! - Feed access (`FeedTransport`)
//! - Incremental crawling (`PostCrawler`)
//! - Classification and reply parsing (`Classifier`, `extract`)
//! - Enrichment (`Enricher`)

pub mod classifier;
pub mod crawler;
pub mod enricher;
pub mod extract;
pub mod feed;
pub mod session;

pub use classifier::{ChatClassifier, Classifier};
pub use crawler::{CrawlReport, CrawlSettings, CrawlState, PostCrawler};
pub use enricher::{EnrichReport, EnrichSettings, Enricher};
pub use extract::{Extraction, ParseFailure, parse_reply};
pub use feed::{FeedTransport, HttpFeedTransport};
pub use session::{
    SessionBootstrapper, StaticBootstrapper, WarmupBootstrapper, bootstrapper_from_config,
};
