use chrono::NaiveDate;

use daybook_core::{Document, DocumentId, DocumentPatch, LineageId, NewDocument};
use daybook_storage::DocumentStore;

use crate::error::EngineError;

/// What the user typed into a virtual continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationRequest {
    pub title: String,
    pub content: String,
    /// Falls back to the base document's color when absent or empty.
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// An entry for (lineage, day) already existed and was returned untouched.
    Existing,
    Created,
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub document: Document,
    pub outcome: MaterializeOutcome,
    /// Token minted for a base that had no lineage.
    pub backfilled: Option<LineageId>,
}

/// Create-or-fetch the entry of the base document's lineage for `today`.
///
/// The lineage backfill, the existence check and the insert are separate
/// store calls. Two sessions running this concurrently can both pass the
/// check and insert twice; the reconciler cleans that up afterwards.
pub fn materialize<S: DocumentStore + ?Sized>(
    store: &mut S,
    base_id: DocumentId,
    request: &ContinuationRequest,
    today: NaiveDate,
) -> Result<Materialized, EngineError> {
    let base = store
        .get_document(base_id)?
        .ok_or_else(|| EngineError::DocumentNotFound(format!("document {base_id}")))?;

    let (lineage_id, backfilled) = match &base.lineage_id {
        Some(lineage_id) => (lineage_id.clone(), None),
        None => {
            let minted = LineageId::mint();
            // Not rolled back if the rest fails: an unused token is harmless.
            store.update_document(base.id, &DocumentPatch::lineage(minted.clone()))?;
            tracing::debug!(base = %base.id, lineage = %minted, "backfilled lineage on base document");
            (minted.clone(), Some(minted))
        }
    };

    if let Some(existing) = store.find_lineage_entry(&lineage_id, today)? {
        tracing::debug!(
            base = %base.id,
            existing = %existing.id,
            lineage = %lineage_id,
            "continuation already materialized"
        );
        return Ok(Materialized {
            document: existing,
            outcome: MaterializeOutcome::Existing,
            backfilled,
        });
    }

    let color = request
        .color
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or(base.color);

    let document = store.insert_document(&NewDocument {
        lineage_id: Some(lineage_id),
        title: request.title.clone(),
        content: request.content.clone(),
        color,
        target_date: Some(today),
    })?;

    tracing::info!(
        base = %base.id,
        created = %document.id,
        date = %today,
        "materialized continuation"
    );

    Ok(Materialized {
        document,
        outcome: MaterializeOutcome::Created,
        backfilled,
    })
}
