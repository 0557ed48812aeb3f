pub mod config;
pub mod error;
pub mod history;
pub mod listing;
pub mod materialize;
pub mod pending;
pub mod reconcile;
pub mod resolver;
pub mod session;
pub mod telemetry;
#[cfg(test)]
mod test_env;

pub use config::{JournalConfig, LoggingConfig};
pub use error::EngineError;
pub use listing::LineageListing;
pub use materialize::{ContinuationRequest, MaterializeOutcome, Materialized};
pub use pending::{PendingWrite, PendingWrites};
pub use reconcile::{DuplicateGroup, ReconcileReport};
pub use resolver::{OpenedDocument, VirtualContinuation};
pub use session::SheetSession;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use daybook_core::{
    Clock, Document, DocumentId, DocumentPatch, LineageId, NewDocument, SystemClock,
};
use daybook_storage::{DocumentStore, SqliteStore};

/// One client's view of a journal store.
///
/// Several `Journal`s may share one database; they do not coordinate, so
/// every multi-step operation here is only as atomic as a single store call.
pub struct Journal<S = SqliteStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: JournalConfig,
    listing: LineageListing,
}

impl Journal<SqliteStore> {
    /// Open the SQLite database named by `config.database_path`.
    pub fn open(config: JournalConfig) -> Result<Self, EngineError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        config: JournalConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let store = SqliteStore::open_with(
            &config.database_path,
            Arc::clone(&clock),
            config.schema_options(),
        )?;
        Ok(Self::new(store, clock, config))
    }
}

impl<S: DocumentStore> Journal<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: JournalConfig) -> Self {
        let listing = LineageListing::new(config.listing_max_age());
        Self {
            store,
            clock,
            config,
            listing,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn require_document(&self, id: DocumentId) -> Result<Document, EngineError> {
        self.store
            .get_document(id)?
            .ok_or_else(|| EngineError::DocumentNotFound(format!("document {id}")))
    }

    // ========================================================================
    // Continuation engine
    // ========================================================================

    /// Load a document and decide whether it is today's entry or rolls over
    /// into a virtual continuation.
    pub fn open_document(&self, id: DocumentId) -> Result<OpenedDocument, EngineError> {
        let doc = self.require_document(id)?;
        Ok(resolver::resolve(doc, self.today()))
    }

    /// Turn the virtual continuation of `base_id` into a stored entry for
    /// today, or return the entry that already exists.
    pub fn materialize(
        &mut self,
        base_id: DocumentId,
        request: &ContinuationRequest,
    ) -> Result<Document, EngineError> {
        self.materialize_detailed(base_id, request)
            .map(|m| m.document)
    }

    pub fn materialize_detailed(
        &mut self,
        base_id: DocumentId,
        request: &ContinuationRequest,
    ) -> Result<Materialized, EngineError> {
        let today = self.today();
        let result = materialize::materialize(&mut self.store, base_id, request, today);
        // A backfill may have landed even when the insert failed.
        self.listing.invalidate();
        if let Err(err) = &result {
            tracing::warn!(base = %base_id, "materialization failed: {err}");
        }
        result
    }

    /// The history stack of the lineage `id` belongs to, newest day first.
    pub fn get_history(&self, id: DocumentId) -> Result<Vec<Document>, EngineError> {
        let doc = self.require_document(id)?;
        let Some(lineage_id) = &doc.lineage_id else {
            return Ok(vec![doc]);
        };
        let docs = self.store.list_documents_by_lineage(lineage_id)?;
        Ok(history::order_history(docs, self.config.effective_history_limit()))
    }

    /// One entry per lineage plus all ungrouped documents, read straight from
    /// the store.
    pub fn list_lineages(&self) -> Result<Vec<Document>, EngineError> {
        let docs = self.store.list_all_documents()?;
        Ok(history::collapse_lineages(docs))
    }

    /// The cached lineage listing, refetched when stale or invalidated.
    pub fn lineages(&mut self) -> Result<&[Document], EngineError> {
        let now = self.clock.now();
        self.listing.get(&self.store, now)
    }

    pub fn refresh_lineages(&mut self) -> Result<&[Document], EngineError> {
        let now = self.clock.now();
        self.listing.refresh(&self.store, now)
    }

    pub fn invalidate_lineages(&mut self) {
        self.listing.invalidate();
    }

    /// Remove same-titled duplicates dated `date`.
    pub fn reconcile_duplicates(&mut self, date: NaiveDate) -> Result<ReconcileReport, EngineError> {
        let report = reconcile::reconcile_duplicates(&mut self.store, date)?;
        if report.deleted > 0 {
            self.listing.invalidate();
        }
        Ok(report)
    }

    // ========================================================================
    // Plain document commands
    // ========================================================================

    /// Start a new lineage with an empty entry for today.
    pub fn create_document(&mut self, title: Option<&str>) -> Result<Document, EngineError> {
        let fields = NewDocument {
            lineage_id: Some(LineageId::mint()),
            title: title.unwrap_or(&self.config.default_title).to_string(),
            content: String::new(),
            color: self.config.default_color.clone(),
            target_date: Some(self.today()),
        };
        let doc = self.store.insert_document(&fields)?;
        self.listing.invalidate();
        tracing::debug!(id = %doc.id, "created document");
        Ok(doc)
    }

    pub fn update_document(
        &mut self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> Result<(), EngineError> {
        if patch.is_empty() {
            self.require_document(id)?;
            return Ok(());
        }
        self.store.update_document(id, patch)?;
        self.listing.invalidate();
        Ok(())
    }

    /// Apply a title or color change to every entry of a lineage.
    pub fn update_lineage(
        &mut self,
        lineage_id: &LineageId,
        patch: &DocumentPatch,
    ) -> Result<usize, EngineError> {
        if patch.lineage_id.is_some() {
            return Err(EngineError::Validation(
                "a lineage cannot be moved to another lineage".into(),
            ));
        }
        if !patch.is_appearance_only() {
            // Shared dates would stack every entry on one day.
            return Err(EngineError::Validation(
                "only title and color can be changed across a lineage".into(),
            ));
        }
        let touched = self.store.update_lineage(lineage_id, patch)?;
        self.listing.invalidate();
        Ok(touched)
    }

    pub fn delete_document(&mut self, id: DocumentId) -> Result<(), EngineError> {
        self.store.delete_document(id)?;
        self.listing.invalidate();
        tracing::debug!(%id, "deleted document");
        Ok(())
    }
}
