//! Pipeline entry points for harvester operations.
//!
//! - `run_crawler`: Page the forum feed into the post store
//! - `run_analysis`: Enrich stored posts with classifier verdicts
//! - `run_pipeline`: Crawl, then analyze if the crawl succeeded
//! - `run_verify`: Check configuration and report store counts
//! - `run_export`: Dump every stored record as JSON

pub mod analyze;
pub mod crawl;
pub mod export;
pub mod pipeline;
pub mod verify;

pub use analyze::run_analysis;
pub use crawl::{CrawlOptions, run_crawler};
pub use export::run_export;
pub use pipeline::{PipelineReport, run_pipeline};
pub use verify::run_verify;
