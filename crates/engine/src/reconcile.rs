use std::collections::HashMap;

use chrono::NaiveDate;

use daybook_core::{Document, DocumentId};
use daybook_storage::DocumentStore;

use crate::error::EngineError;

/// Same-titled entries of one day, reduced to a single survivor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub title: String,
    pub keep: DocumentId,
    pub remove: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub groups: Vec<DuplicateGroup>,
    pub deleted: usize,
}

impl ReconcileReport {
    pub fn removed_ids(&self) -> Vec<DocumentId> {
        self.groups
            .iter()
            .flat_map(|g| g.remove.iter().copied())
            .collect()
    }
}

/// Group one day's documents by title and pick the survivor of every group
/// with more than one member: the latest `created_at`, then the highest id.
///
/// Grouping is by title rather than lineage because a racing backfill can
/// leave duplicates under different lineage tokens. Unrelated documents that
/// happen to share a title are collapsed too.
pub fn plan_duplicates(docs: &[Document]) -> Vec<DuplicateGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_title: HashMap<&str, Vec<&Document>> = HashMap::new();
    for doc in docs {
        by_title
            .entry(doc.title.as_str())
            .or_insert_with(|| {
                order.push(doc.title.as_str());
                Vec::new()
            })
            .push(doc);
    }

    let mut groups = Vec::new();
    for title in order {
        let Some(mut members) = by_title.remove(title) else {
            continue;
        };
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        groups.push(DuplicateGroup {
            title: title.to_string(),
            keep: members[0].id,
            remove: members[1..].iter().map(|d| d.id).collect(),
        });
    }
    groups
}

/// Delete redundant entries dated `date`. Each deletion is logged before it
/// is issued.
pub fn reconcile_duplicates<S: DocumentStore + ?Sized>(
    store: &mut S,
    date: NaiveDate,
) -> Result<ReconcileReport, EngineError> {
    let docs = store.list_documents_by_date(date)?;
    let groups = plan_duplicates(&docs);
    if groups.is_empty() {
        tracing::debug!(%date, scanned = docs.len(), "no duplicate entries");
        return Ok(ReconcileReport::default());
    }

    for group in &groups {
        tracing::warn!(
            %date,
            title = %group.title,
            keep = %group.keep,
            remove = ?group.remove,
            "removing duplicate entries"
        );
    }

    let mut report = ReconcileReport {
        groups,
        deleted: 0,
    };
    report.deleted = store.delete_documents_by_ids(&report.removed_ids())?;
    Ok(report)
}
