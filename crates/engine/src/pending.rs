use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use daybook_core::{DocumentId, DocumentPatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub document_id: DocumentId,
    pub patch: DocumentPatch,
    pub due_at: DateTime<Utc>,
}

/// Debounced writes, at most one per document.
///
/// Scheduling a write for a document that already has one replaces it, so
/// only the latest edit inside the window is ever issued. Nothing here talks
/// to the store; callers take due writes out and issue them.
#[derive(Debug, Default)]
pub struct PendingWrites {
    slots: BTreeMap<DocumentId, PendingWrite>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the write that was superseded, if any.
    pub fn schedule(
        &mut self,
        document_id: DocumentId,
        patch: DocumentPatch,
        due_at: DateTime<Utc>,
    ) -> Option<PendingWrite> {
        self.slots.insert(
            document_id,
            PendingWrite {
                document_id,
                patch,
                due_at,
            },
        )
    }

    pub fn cancel(&mut self, document_id: DocumentId) -> Option<PendingWrite> {
        self.slots.remove(&document_id)
    }

    /// Remove and return every write whose deadline is at or before `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<PendingWrite> {
        let due: Vec<DocumentId> = self
            .slots
            .values()
            .filter(|w| w.due_at <= now)
            .map(|w| w.document_id)
            .collect();
        due.into_iter()
            .filter_map(|id| self.slots.remove(&id))
            .collect()
    }

    /// Remove and return every pending write regardless of deadline.
    pub fn drain(&mut self) -> Vec<PendingWrite> {
        std::mem::take(&mut self.slots).into_values().collect()
    }

    pub fn get(&self, document_id: DocumentId) -> Option<&PendingWrite> {
        self.slots.get(&document_id)
    }

    pub fn is_pending(&self, document_id: DocumentId) -> bool {
        self.slots.contains_key(&document_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
