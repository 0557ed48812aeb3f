use chrono::{DateTime, Duration, Utc};

use daybook_core::Document;
use daybook_storage::DocumentStore;

use crate::error::EngineError;
use crate::history::collapse_lineages;

/// Client-side cache of the collapsed lineage listing.
///
/// The listing is refetched when it is older than `max_age`, after
/// `invalidate`, or on an explicit `refresh`. Nothing refreshes it in the
/// background.
#[derive(Debug)]
pub struct LineageListing {
    entries: Vec<Document>,
    fetched_at: Option<DateTime<Utc>>,
    max_age: Duration,
}

impl LineageListing {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Vec::new(),
            fetched_at: None,
            max_age,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(at) => now - at < self.max_age,
            None => false,
        }
    }

    pub fn get<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<&[Document], EngineError> {
        if !self.is_fresh(now) {
            self.refresh(store, now)?;
        }
        Ok(&self.entries)
    }

    pub fn refresh<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<&[Document], EngineError> {
        let docs = store.list_all_documents()?;
        self.entries = collapse_lineages(docs);
        self.fetched_at = Some(now);
        Ok(&self.entries)
    }

    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}
