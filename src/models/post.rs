//! Post data structures shared by the crawler, the store and the enricher.

use serde::{Deserialize, Deserializer, Serialize};

/// One stored post plus its (possibly absent) enrichment result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Store-assigned surrogate key
    pub id: i64,

    /// Unique across the store
    pub title: String,

    pub content: Option<String>,

    /// `YYYY-MM-DD HH:MM:SS`, or the raw source value when it could not be normalized
    pub post_date: String,

    /// Set by the store at insertion
    pub ingested_at: String,

    pub relevance_score: Option<i64>,

    /// Serialized JSON object
    pub structured_fields: Option<String>,

    pub enriched_at: Option<String>,
}

impl PostRecord {
    /// Whether the enrichment triple has been written.
    pub fn is_enriched(&self) -> bool {
        self.enriched_at.is_some()
    }

}

/// Projection of a record awaiting enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPost {
    pub id: i64,
    pub title: String,
    pub content: String,
}

/// Result of an insert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same title already exists; nothing was written.
    DuplicateSkipped,
    Failed(String),
}

/// A post summary as listed by the feed. Only the id is needed for paging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostSummary {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// A full post as returned by the feed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PostDetail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Absent or `null` for posts without a body; stored as NULL
    #[serde(default)]
    pub content: Option<String>,

    /// ISO-8601 creation time, possibly `Z`-suffixed
    #[serde(default, rename = "createdAt", deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Feed ids arrive as JSON numbers or strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
