use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, DocumentPatch, LineageId, NewDocument};

use crate::error::StorageError;

/// Persistence contract consumed by the continuation engine.
///
/// Every call is an independent unit: nothing spans two calls, so a
/// check-then-insert issued by a caller is not atomic.
pub trait DocumentStore {
    fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StorageError>;

    /// The entry of `lineage_id` dated `date`. When duplicates exist the one
    /// with the lowest id is returned.
    fn find_lineage_entry(
        &self,
        lineage_id: &LineageId,
        date: NaiveDate,
    ) -> Result<Option<Document>, StorageError>;

    /// All documents of a lineage, in id order.
    fn list_documents_by_lineage(
        &self,
        lineage_id: &LineageId,
    ) -> Result<Vec<Document>, StorageError>;

    /// All documents whose target date is `date`, in id order.
    fn list_documents_by_date(&self, date: NaiveDate) -> Result<Vec<Document>, StorageError>;

    /// Every document, most recently updated first.
    fn list_all_documents(&self) -> Result<Vec<Document>, StorageError>;

    fn insert_document(&mut self, fields: &NewDocument) -> Result<Document, StorageError>;

    /// Apply `patch` and refresh `updated_at`. A lineage id in the patch is
    /// only written when the document has none.
    fn update_document(
        &mut self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> Result<(), StorageError>;

    /// Apply a title/color `patch` to every document of a lineage. Patches
    /// touching per-entry fields are a validation error. Returns the number
    /// of documents touched.
    fn update_lineage(
        &mut self,
        lineage_id: &LineageId,
        patch: &DocumentPatch,
    ) -> Result<usize, StorageError>;

    fn delete_document(&mut self, id: DocumentId) -> Result<(), StorageError>;

    /// Delete whichever of `ids` exist. Returns the number removed.
    fn delete_documents_by_ids(&mut self, ids: &[DocumentId]) -> Result<usize, StorageError>;
}
