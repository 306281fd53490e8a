//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, params};

use super::{PostStore, schema};
use crate::error::{AppError, Result};
use crate::models::{InsertOutcome, PendingPost, PostRecord, StoreStats};
use crate::utils::time::now_timestamp;

/// SQLite-backed post store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        log::debug!("Opened database {}", path.display());
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema. Safe to run against an existing database.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::storage("database connection lock poisoned"))
    }

    fn try_insert(
        &self,
        title: &str,
        content: Option<&str>,
        post_date: &str,
    ) -> Result<InsertOutcome> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO posts (title, content, post_date, ingested_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, content, post_date, now_timestamp()],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(InsertOutcome::DuplicateSkipped)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn try_list_unenriched(&self, limit: Option<usize>) -> Result<Vec<PendingPost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, content
            FROM posts
            WHERE enriched_at IS NULL
              AND content IS NOT NULL
              AND content <> ''
            ORDER BY id
            LIMIT ?1
            "#,
        )?;

        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let posts = stmt
            .query_map([limit], |row| {
                Ok(PendingPost {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(posts)
    }

    fn try_apply_enrichment(
        &self,
        id: i64,
        relevance_score: i64,
        structured_fields: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE posts
            SET relevance_score = ?1, structured_fields = ?2, enriched_at = ?3
            WHERE id = ?4 AND enriched_at IS NULL
            "#,
            params![relevance_score, structured_fields, now_timestamp(), id],
        )?;
        Ok(changed == 1)
    }

    fn try_list_all(&self) -> Result<Vec<PostRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY id",
            schema::RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Helper to convert a row to a PostRecord
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<PostRecord> {
        Ok(PostRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            post_date: row.get(3)?,
            ingested_at: row.get(4)?,
            relevance_score: row.get(5)?,
            structured_fields: row.get(6)?,
            enriched_at: row.get(7)?,
        })
    }
}

impl PostStore for SqliteStore {
    fn insert(&self, title: &str, content: Option<&str>, post_date: &str) -> InsertOutcome {
        match self.try_insert(title, content, post_date) {
            Ok(InsertOutcome::Inserted) => {
                log::info!("Stored post: {}", title);
                InsertOutcome::Inserted
            }
            Ok(InsertOutcome::DuplicateSkipped) => {
                log::info!("Post already stored, skipping: {}", title);
                InsertOutcome::DuplicateSkipped
            }
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Failed to store post '{}': {}", title, e);
                InsertOutcome::Failed(e.to_string())
            }
        }
    }

    fn list_unenriched_limit(&self, limit: Option<usize>) -> Vec<PendingPost> {
        self.try_list_unenriched(limit).unwrap_or_else(|e| {
            log::error!("Failed to list unenriched posts: {}", e);
            Vec::new()
        })
    }

    fn apply_enrichment(&self, id: i64, relevance_score: i64, structured_fields: &str) -> bool {
        match self.try_apply_enrichment(id, relevance_score, structured_fields) {
            Ok(true) => {
                log::debug!("Enrichment stored for post {}", id);
                true
            }
            Ok(false) => {
                log::warn!("No unenriched post with id {}", id);
                false
            }
            Err(e) => {
                log::error!("Failed to store enrichment for post {}: {}", id, e);
                false
            }
        }
    }

    fn list_all(&self) -> Vec<PostRecord> {
        self.try_list_all().unwrap_or_else(|e| {
            log::error!("Failed to list posts: {}", e);
            Vec::new()
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let (total, enriched, pending): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COUNT(enriched_at),
                COALESCE(SUM(enriched_at IS NULL AND content IS NOT NULL AND content <> ''), 0)
            FROM posts
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            total: total as usize,
            enriched: enriched as usize,
            pending: pending as usize,
        })
    }
}

#[cfg(test)]
impl SqliteStore {
    /// Fetch a single record by id.
    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE id = ?1",
            schema::RECORD_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id], Self::row_to_record)?;
        rows.next().transpose().map_err(Into::into)
    }
}
