//! Storage abstractions for post persistence.
//!
//! One table of posts, unique on title, with a tri-state enrichment lifecycle:
//!
//! ```text
//! inserted ──(apply_enrichment)──▶ enriched
//!   score/fields/enriched_at NULL     all three set
//! ```
//!
//! Operations never return errors to the pipeline: failures are logged and
//! reported through the return value.

pub mod schema;
pub mod sqlite;

use crate::error::Result;
use crate::models::{InsertOutcome, PendingPost, PostRecord, StoreStats};

// Re-export for convenience
pub use sqlite::SqliteStore;

/// Trait for post storage backends.
pub trait PostStore: Send + Sync {
    /// Insert a post. A title that is already stored is skipped, whatever its content.
    fn insert(&self, title: &str, content: Option<&str>, post_date: &str) -> InsertOutcome;

    /// Posts with non-empty content that have not been enriched, in insertion order.
    fn list_unenriched(&self) -> Vec<PendingPost> {
        self.list_unenriched_limit(None)
    }

    /// Same as [`PostStore::list_unenriched`], capped to `limit` rows.
    fn list_unenriched_limit(&self, limit: Option<usize>) -> Vec<PendingPost>;

    /// Write score, fields and `enriched_at` together.
    ///
    /// Returns `false` when no unenriched row with this id exists.
    fn apply_enrichment(&self, id: i64, relevance_score: i64, structured_fields: &str) -> bool;

    /// Snapshot of every stored record.
    fn list_all(&self) -> Vec<PostRecord>;

    /// Row counts by lifecycle state.
    fn stats(&self) -> Result<StoreStats>;
}
