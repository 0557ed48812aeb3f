use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, LineageId};

/// The unsaved entry a stale document rolls over into. It only becomes a
/// stored document once the user writes something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualContinuation {
    /// The stale document this continues. History lookups go through it.
    pub base_id: DocumentId,
    pub lineage_id: Option<LineageId>,
    pub title: String,
    pub color: String,
    pub content: String,
    pub display_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenedDocument {
    Current(Document),
    Virtual(VirtualContinuation),
}

impl OpenedDocument {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    pub fn display_date(&self) -> NaiveDate {
        match self {
            Self::Current(doc) => doc.effective_date(),
            Self::Virtual(v) => v.display_date,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Current(doc) => &doc.title,
            Self::Virtual(v) => &v.title,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Self::Current(doc) => &doc.color,
            Self::Virtual(v) => &v.color,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Current(doc) => &doc.content,
            Self::Virtual(v) => &v.content,
        }
    }

    pub fn lineage_id(&self) -> Option<&LineageId> {
        match self {
            Self::Current(doc) => doc.lineage_id.as_ref(),
            Self::Virtual(v) => v.lineage_id.as_ref(),
        }
    }

    /// The stored document behind this view: itself, or the base of a rollover.
    pub fn document_id(&self) -> DocumentId {
        match self {
            Self::Current(doc) => doc.id,
            Self::Virtual(v) => v.base_id,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Current(doc) => Some(doc),
            Self::Virtual(_) => None,
        }
    }
}

pub fn is_stale(doc: &Document, today: NaiveDate) -> bool {
    doc.effective_date() < today
}

/// Classify a freshly loaded document against `today`.
pub fn resolve(doc: Document, today: NaiveDate) -> OpenedDocument {
    if !is_stale(&doc, today) {
        return OpenedDocument::Current(doc);
    }
    OpenedDocument::Virtual(VirtualContinuation {
        base_id: doc.id,
        lineage_id: doc.lineage_id,
        title: doc.title,
        color: doc.color,
        content: String::new(),
        display_date: today,
    })
}
