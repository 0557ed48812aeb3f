use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// Schema knobs chosen when a store is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Reject a second document for the same (lineage, date) at insert time.
    pub enforce_lineage_date_unique: bool,
}

pub fn init_schema(conn: &Connection, options: SchemaOptions) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -8000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    if options.enforce_lineage_date_unique {
        conn.execute_batch(LINEAGE_DATE_UNIQUE_SQL)?;
    }
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lineage_id TEXT CHECK (lineage_id IS NULL OR length(lineage_id) > 0),
    title TEXT NOT NULL DEFAULT 'Untitled',
    content TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#d8b4fe',
    target_date TEXT CHECK (target_date IS NULL OR length(target_date) = 10),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_lineage_date ON documents (lineage_id, target_date);
CREATE INDEX IF NOT EXISTS idx_documents_target_date ON documents (target_date);
CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents (updated_at);
";

const LINEAGE_DATE_UNIQUE_SQL: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_lineage_date_unique
    ON documents (lineage_id, target_date)
    WHERE lineage_id IS NOT NULL AND target_date IS NOT NULL;
";
