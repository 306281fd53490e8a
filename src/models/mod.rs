// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod post;
mod session;

// Re-export all public types
pub use config::{
    Config, EnrichConfig, FeedConfig, LlmConfig, SessionConfig, SessionMode, StorageConfig,
};
pub use post::{InsertOutcome, PendingPost, PostDetail, PostRecord, PostSummary};
pub use session::Session;

/// Counts describing the store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub enriched: usize,
    /// Unenriched rows with non-empty content
    pub pending: usize,
}
