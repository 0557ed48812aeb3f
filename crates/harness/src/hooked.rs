use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, DocumentPatch, LineageId, NewDocument};
use daybook_storage::{DocumentStore, StorageError};

type Hook = Box<dyn FnOnce()>;

/// Wraps a store and runs one-shot hooks between the steps of a caller's
/// protocol, so that another client's work can be slotted into the gap.
pub struct HookedStore<S> {
    inner: S,
    before_insert: Option<Hook>,
    before_backfill: Option<Hook>,
    fail_next_insert: bool,
    inserts: usize,
    updates: usize,
}

impl<S: DocumentStore> HookedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            before_insert: None,
            before_backfill: None,
            fail_next_insert: false,
            inserts: 0,
            updates: 0,
        }
    }

    /// Run `hook` right before the next insert reaches the store.
    pub fn before_insert(&mut self, hook: impl FnOnce() + 'static) {
        self.before_insert = Some(Box::new(hook));
    }

    /// Run `hook` right before the next lineage backfill reaches the store.
    pub fn before_backfill(&mut self, hook: impl FnOnce() + 'static) {
        self.before_backfill = Some(Box::new(hook));
    }

    /// Make the next insert fail as if the database were unreachable.
    pub fn fail_next_insert(&mut self) {
        self.fail_next_insert = true;
    }

    /// Inserts that reached the inner store.
    pub fn inserts(&self) -> usize {
        self.inserts
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn unavailable() -> StorageError {
    StorageError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        Some("database is locked".to_string()),
    ))
}

impl<S: DocumentStore> DocumentStore for HookedStore<S> {
    fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StorageError> {
        self.inner.get_document(id)
    }

    fn find_lineage_entry(
        &self,
        lineage_id: &LineageId,
        date: NaiveDate,
    ) -> Result<Option<Document>, StorageError> {
        self.inner.find_lineage_entry(lineage_id, date)
    }

    fn list_documents_by_lineage(
        &self,
        lineage_id: &LineageId,
    ) -> Result<Vec<Document>, StorageError> {
        self.inner.list_documents_by_lineage(lineage_id)
    }

    fn list_documents_by_date(&self, date: NaiveDate) -> Result<Vec<Document>, StorageError> {
        self.inner.list_documents_by_date(date)
    }

    fn list_all_documents(&self) -> Result<Vec<Document>, StorageError> {
        self.inner.list_all_documents()
    }

    fn insert_document(&mut self, fields: &NewDocument) -> Result<Document, StorageError> {
        if let Some(hook) = self.before_insert.take() {
            hook();
        }
        if std::mem::take(&mut self.fail_next_insert) {
            return Err(unavailable());
        }
        let doc = self.inner.insert_document(fields)?;
        self.inserts += 1;
        Ok(doc)
    }

    fn update_document(
        &mut self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> Result<(), StorageError> {
        if patch.lineage_id.is_some() {
            if let Some(hook) = self.before_backfill.take() {
                hook();
            }
        }
        self.inner.update_document(id, patch)?;
        self.updates += 1;
        Ok(())
    }

    fn update_lineage(
        &mut self,
        lineage_id: &LineageId,
        patch: &DocumentPatch,
    ) -> Result<usize, StorageError> {
        self.inner.update_lineage(lineage_id, patch)
    }

    fn delete_document(&mut self, id: DocumentId) -> Result<(), StorageError> {
        self.inner.delete_document(id)
    }

    fn delete_documents_by_ids(&mut self, ids: &[DocumentId]) -> Result<usize, StorageError> {
        self.inner.delete_documents_by_ids(ids)
    }
}
