use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("lineage {lineage_id} already has an entry for {date}")]
    LineageDateConflict { lineage_id: String, date: String },

    #[error("core error: {0}")]
    Core(#[from] daybook_core::CoreError),
}

impl StorageError {
    /// Transport or engine-level failures, as opposed to a rejected request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }
}
