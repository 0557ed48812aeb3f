use daybook_core::CoreError;
use daybook_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("core error: {0}")]
    Core(#[source] CoreError),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("lineage {lineage_id} already has an entry for {date}")]
    LineageDateConflict { lineage_id: String, date: String },

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// The store could not be reached or failed internally. The caller keeps
    /// its in-memory state and may retry on the next user action.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_unavailable())
    }
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::DocumentNotFound(what),
            StorageError::Validation(msg) => Self::Validation(msg),
            StorageError::LineageDateConflict { lineage_id, date } => {
                Self::LineageDateConflict { lineage_id, date }
            }
            StorageError::Core(CoreError::Validation(msg)) => Self::Validation(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Core(other),
        }
    }
}
