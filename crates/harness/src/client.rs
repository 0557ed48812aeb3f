use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, LineageId, ManualClock, NewDocument};
use daybook_engine::{ContinuationRequest, EngineError, Journal, JournalConfig, SheetSession};
use daybook_storage::{DocumentStore, SqliteStore};

/// One client session with its own connection to a shared database.
pub struct TestClient {
    pub journal: Journal<SqliteStore>,
}

impl TestClient {
    pub fn open(
        path: &Path,
        clock: ManualClock,
        config: &JournalConfig,
    ) -> Result<Self, EngineError> {
        let mut config = config.clone();
        config.database_path = path.to_path_buf();
        let journal = Journal::open_with_clock(config, Arc::new(clock))?;
        Ok(Self { journal })
    }

    /// Insert a document directly, the way an older client or an earlier day
    /// would have left it.
    pub fn seed(
        &mut self,
        lineage_id: Option<&LineageId>,
        title: &str,
        content: &str,
        target_date: Option<NaiveDate>,
    ) -> Result<Document, Box<dyn Error>> {
        let color = self.journal.config().default_color.clone();
        let doc = self.journal.store_mut().insert_document(&NewDocument {
            lineage_id: lineage_id.cloned(),
            title: title.to_string(),
            content: content.to_string(),
            color,
            target_date,
        })?;
        self.journal.invalidate_lineages();
        Ok(doc)
    }

    /// Materialize today's continuation of `base_id` with the base's title and
    /// color.
    pub fn continue_from(
        &mut self,
        base_id: DocumentId,
        content: &str,
    ) -> Result<Document, Box<dyn Error>> {
        let base = self
            .document(base_id)?
            .ok_or_else(|| EngineError::DocumentNotFound(format!("document {base_id}")))?;
        let doc = self.journal.materialize(
            base_id,
            &ContinuationRequest {
                title: base.title,
                content: content.to_string(),
                color: None,
            },
        )?;
        Ok(doc)
    }

    pub fn open_session(&self, id: DocumentId) -> Result<SheetSession, EngineError> {
        SheetSession::open(&self.journal, id)
    }

    pub fn document(&self, id: DocumentId) -> Result<Option<Document>, EngineError> {
        Ok(self.journal.store().get_document(id)?)
    }

    pub fn document_count(&self) -> Result<u64, EngineError> {
        Ok(self.journal.store().document_count()?)
    }

    pub fn documents_on(&self, date: NaiveDate) -> Result<Vec<Document>, EngineError> {
        Ok(self.journal.store().list_documents_by_date(date)?)
    }
}
