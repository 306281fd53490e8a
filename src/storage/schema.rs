//! Database schema definitions

/// SQL to create the posts table.
///
/// The CHECK keeps the enrichment columns null together or set together.
pub const CREATE_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    content TEXT,
    post_date TEXT NOT NULL,
    ingested_at TEXT NOT NULL,
    relevance_score INTEGER DEFAULT NULL,
    structured_fields TEXT DEFAULT NULL,
    enriched_at TEXT DEFAULT NULL,
    CHECK (
        (relevance_score IS NULL AND structured_fields IS NULL AND enriched_at IS NULL)
        OR (relevance_score IS NOT NULL AND structured_fields IS NOT NULL AND enriched_at IS NOT NULL)
    )
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] =
    &["CREATE INDEX IF NOT EXISTS idx_posts_enriched_at ON posts(enriched_at)"];

/// Columns in the order `row_to_record` expects.
pub const RECORD_COLUMNS: &str = "id, title, content, post_date, ingested_at, \
     relevance_score, structured_fields, enriched_at";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_POSTS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
