use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, DocumentPatch};
use daybook_storage::DocumentStore;

use crate::error::EngineError;
use crate::materialize::{ContinuationRequest, MaterializeOutcome};
use crate::pending::{PendingWrite, PendingWrites};
use crate::resolver::OpenedDocument;
use crate::Journal;

/// One open editor view over a document.
///
/// A rolled-over document stays virtual until the first content edit, which
/// materializes today's entry and re-targets the session at it. If that entry
/// already existed, the edit is queued onto it instead of being dropped. After that,
/// content edits are debounced through a single pending slot while title and
/// color changes are written immediately.
#[derive(Debug)]
pub struct SheetSession {
    view: OpenedDocument,
    pending: PendingWrites,
}

impl SheetSession {
    pub fn open<S: DocumentStore>(
        journal: &Journal<S>,
        id: DocumentId,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            view: journal.open_document(id)?,
            pending: PendingWrites::new(),
        })
    }

    pub fn view(&self) -> &OpenedDocument {
        &self.view
    }

    pub fn is_virtual(&self) -> bool {
        self.view.is_virtual()
    }

    /// Where navigation should point: the stored entry, or the stale base
    /// while still virtual.
    pub fn target_id(&self) -> DocumentId {
        self.view.document_id()
    }

    pub fn display_date(&self) -> NaiveDate {
        self.view.display_date()
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    pub fn edit_content<S: DocumentStore>(
        &mut self,
        journal: &mut Journal<S>,
        content: &str,
    ) -> Result<(), EngineError> {
        match &mut self.view {
            OpenedDocument::Virtual(v) => {
                let base_id = v.base_id;
                let request = ContinuationRequest {
                    title: v.title.clone(),
                    content: content.to_string(),
                    color: Some(v.color.clone()),
                };
                let materialized = match journal.materialize_detailed(base_id, &request) {
                    Err(EngineError::LineageDateConflict { .. }) => {
                        // Another session inserted first; this now finds its entry.
                        journal.materialize_detailed(base_id, &request)?
                    }
                    other => other?,
                };
                let mut doc = materialized.document;
                if materialized.outcome == MaterializeOutcome::Existing {
                    // The entry predates this edit. Carry the edit and any
                    // seed changes made while virtual onto it.
                    let patch = adopt(&mut doc, &request);
                    if !patch.is_empty() {
                        self.pending.schedule(
                            doc.id,
                            patch,
                            journal.now() + journal.config().write_debounce(),
                        );
                    }
                }
                tracing::debug!(from = %base_id, to = %doc.id, "session re-targeted");
                self.view = OpenedDocument::Current(doc);
            }
            OpenedDocument::Current(doc) => {
                doc.content = content.to_string();
                self.pending.schedule(
                    doc.id,
                    DocumentPatch::content(content),
                    journal.now() + journal.config().write_debounce(),
                );
            }
        }
        Ok(())
    }

    pub fn edit_title<S: DocumentStore>(
        &mut self,
        journal: &mut Journal<S>,
        title: &str,
    ) -> Result<(), EngineError> {
        match &mut self.view {
            OpenedDocument::Virtual(v) => {
                daybook_core::document::validate_title(title)?;
                v.title = title.to_string();
            }
            OpenedDocument::Current(doc) => {
                journal.update_document(doc.id, &DocumentPatch::title(title))?;
                doc.title = title.to_string();
            }
        }
        Ok(())
    }

    pub fn edit_color<S: DocumentStore>(
        &mut self,
        journal: &mut Journal<S>,
        color: &str,
    ) -> Result<(), EngineError> {
        match &mut self.view {
            OpenedDocument::Virtual(v) => {
                daybook_core::document::validate_color(color)?;
                v.color = color.to_string();
            }
            OpenedDocument::Current(doc) => {
                journal.update_document(doc.id, &DocumentPatch::color(color))?;
                doc.color = color.to_string();
            }
        }
        Ok(())
    }

    /// Issue writes whose debounce window has passed. Returns how many landed.
    pub fn poll<S: DocumentStore>(&mut self, journal: &mut Journal<S>) -> Result<usize, EngineError> {
        let due = self.pending.take_due(journal.now());
        issue(journal, due)
    }

    /// Issue every pending write now.
    pub fn flush<S: DocumentStore>(&mut self, journal: &mut Journal<S>) -> Result<usize, EngineError> {
        let all = self.pending.drain();
        issue(journal, all)
    }
}

/// Bring an adopted entry in line with what the session has shown, returning
/// the patch that makes the store match.
fn adopt(doc: &mut Document, request: &ContinuationRequest) -> DocumentPatch {
    let mut patch = DocumentPatch::default();
    if doc.content != request.content {
        doc.content = request.content.clone();
        patch.content = Some(request.content.clone());
    }
    if doc.title != request.title {
        doc.title = request.title.clone();
        patch.title = Some(request.title.clone());
    }
    if let Some(color) = request.color.as_ref().filter(|c| **c != doc.color) {
        doc.color = color.clone();
        patch.color = Some(color.clone());
    }
    patch
}

/// Failed writes are logged and dropped; the in-memory view keeps the edit
/// and the next edit schedules it again. The first failure is returned.
fn issue<S: DocumentStore>(
    journal: &mut Journal<S>,
    writes: Vec<PendingWrite>,
) -> Result<usize, EngineError> {
    let mut landed = 0;
    let mut first_err = None;
    for write in writes {
        match journal.update_document(write.document_id, &write.patch) {
            Ok(()) => landed += 1,
            Err(err) => {
                tracing::warn!(document = %write.document_id, "pending write failed: {err}");
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(landed),
    }
}
