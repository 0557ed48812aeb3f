use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use daybook_core::{
    document::{format_date, parse_date},
    Clock, CoreError, Document, DocumentId, DocumentPatch, LineageId, NewDocument, SystemClock,
};

use crate::error::StorageError;
use crate::schema::{init_schema, SchemaOptions};
use crate::traits::DocumentStore;

const DOCUMENT_COLUMNS: &str =
    "id, lineage_id, title, content, color, target_date, created_at, updated_at";

pub struct SqliteStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
    options: SchemaOptions,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(path, Arc::new(SystemClock), SchemaOptions::default())
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
        options: SchemaOptions,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        init_schema(&conn, options)?;
        Ok(Self {
            conn,
            clock,
            options,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open_in_memory_with(Arc::new(SystemClock), SchemaOptions::default())
    }

    pub fn open_in_memory_with(
        clock: Arc<dyn Clock>,
        options: SchemaOptions,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn, options)?;
        Ok(Self {
            conn,
            clock,
            options,
        })
    }

    pub fn options(&self) -> SchemaOptions {
        self.options
    }

    pub fn document_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn query_documents<P: rusqlite::Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Vec<Document>, StorageError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents {filter}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, read_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawDocument::into_document).collect()
    }
}

/// Column values exactly as stored, before conversion into domain types.
struct RawDocument {
    id: i64,
    lineage_id: Option<String>,
    title: String,
    content: String,
    color: String,
    target_date: Option<String>,
    created_at: i64,
    updated_at: i64,
}

fn read_raw(row: &rusqlite::Row) -> rusqlite::Result<RawDocument> {
    Ok(RawDocument {
        id: row.get(0)?,
        lineage_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        color: row.get(4)?,
        target_date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl RawDocument {
    fn into_document(self) -> Result<Document, StorageError> {
        let lineage_id = self.lineage_id.map(LineageId::parse).transpose()?;
        let target_date = self.target_date.as_deref().map(parse_date).transpose()?;
        Ok(Document {
            id: DocumentId::from_raw(self.id),
            lineage_id,
            title: self.title,
            content: self.content,
            color: self.color,
            target_date,
            created_at: from_millis(self.created_at, "created_at")?,
            updated_at: from_millis(self.updated_at, "updated_at")?,
        })
    }
}

fn from_millis(ms: i64, label: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Serialization(format!("{label} out of range: {ms}")))
}

/// Map a failed write. A unique-index violation is the (lineage, date) rule
/// rejecting the row, not a store outage.
fn write_error(
    err: rusqlite::Error,
    lineage_id: Option<String>,
    date: Option<String>,
) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::LineageDateConflict {
                lineage_id: lineage_id.unwrap_or_default(),
                date: date.unwrap_or_default(),
            }
        }
        other => StorageError::Sqlite(other),
    }
}

fn validation_error(err: CoreError) -> StorageError {
    match err {
        CoreError::Validation(msg) => StorageError::Validation(msg),
        other => StorageError::Core(other),
    }
}

impl DocumentStore for SqliteStore {
    fn get_document(&self, id: DocumentId) -> Result<Option<Document>, StorageError> {
        let mut docs = self.query_documents("WHERE id = ?1", rusqlite::params![id.as_raw()])?;
        Ok(docs.pop())
    }

    fn find_lineage_entry(
        &self,
        lineage_id: &LineageId,
        date: NaiveDate,
    ) -> Result<Option<Document>, StorageError> {
        let mut docs = self.query_documents(
            "WHERE lineage_id = ?1 AND target_date = ?2 ORDER BY id LIMIT 1",
            rusqlite::params![lineage_id.as_str(), format_date(date)],
        )?;
        Ok(docs.pop())
    }

    fn list_documents_by_lineage(
        &self,
        lineage_id: &LineageId,
    ) -> Result<Vec<Document>, StorageError> {
        self.query_documents(
            "WHERE lineage_id = ?1 ORDER BY id",
            rusqlite::params![lineage_id.as_str()],
        )
    }

    fn list_documents_by_date(&self, date: NaiveDate) -> Result<Vec<Document>, StorageError> {
        self.query_documents(
            "WHERE target_date = ?1 ORDER BY id",
            rusqlite::params![format_date(date)],
        )
    }

    fn list_all_documents(&self) -> Result<Vec<Document>, StorageError> {
        self.query_documents("ORDER BY updated_at DESC, id DESC", [])
    }

    fn insert_document(&mut self, fields: &NewDocument) -> Result<Document, StorageError> {
        fields.validate().map_err(validation_error)?;
        let now = self.now_ms();
        let target_date = fields.target_date.map(format_date);

        let result = self.conn.execute(
            "INSERT INTO documents (lineage_id, title, content, color, target_date, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                fields.lineage_id.as_ref().map(LineageId::as_str),
                fields.title,
                fields.content,
                fields.color,
                target_date,
                now,
            ],
        );
        if let Err(err) = result {
            return Err(write_error(
                err,
                fields.lineage_id.as_ref().map(ToString::to_string),
                target_date,
            ));
        }

        let stamp = from_millis(now, "created_at")?;
        Ok(Document {
            id: DocumentId::from_raw(self.conn.last_insert_rowid()),
            lineage_id: fields.lineage_id.clone(),
            title: fields.title.clone(),
            content: fields.content.clone(),
            color: fields.color.clone(),
            target_date: fields.target_date,
            created_at: stamp,
            updated_at: stamp,
        })
    }

    fn update_document(
        &mut self,
        id: DocumentId,
        patch: &DocumentPatch,
    ) -> Result<(), StorageError> {
        patch.validate().map_err(validation_error)?;
        let result = self.conn.execute(
            "UPDATE documents SET
                title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                color = COALESCE(?3, color),
                target_date = COALESCE(?4, target_date),
                lineage_id = COALESCE(lineage_id, ?5),
                updated_at = ?6
             WHERE id = ?7",
            rusqlite::params![
                patch.title.as_deref(),
                patch.content.as_deref(),
                patch.color.as_deref(),
                patch.target_date.map(format_date),
                patch.lineage_id.as_ref().map(LineageId::as_str),
                self.now_ms(),
                id.as_raw(),
            ],
        );
        let changed = match result {
            Ok(changed) => changed,
            Err(err) => {
                // The row is untouched, so its stored values fill in what the
                // patch left out.
                let stored = self.get_document(id).ok().flatten();
                let lineage_id = stored
                    .as_ref()
                    .and_then(|d| d.lineage_id.clone())
                    .or_else(|| patch.lineage_id.clone())
                    .map(|l| l.to_string());
                let date = patch
                    .target_date
                    .or_else(|| stored.as_ref().and_then(|d| d.target_date))
                    .map(format_date);
                return Err(write_error(err, lineage_id, date));
            }
        };
        if changed == 0 {
            return Err(StorageError::NotFound(format!("document {id}")));
        }
        Ok(())
    }

    fn update_lineage(
        &mut self,
        lineage_id: &LineageId,
        patch: &DocumentPatch,
    ) -> Result<usize, StorageError> {
        if !patch.is_appearance_only() {
            return Err(StorageError::Validation(
                "only title and color can be changed across a lineage".into(),
            ));
        }
        patch.validate().map_err(validation_error)?;
        self.conn
            .execute(
                "UPDATE documents SET
                    title = COALESCE(?1, title),
                    color = COALESCE(?2, color),
                    updated_at = ?3
                 WHERE lineage_id = ?4",
                rusqlite::params![
                    patch.title.as_deref(),
                    patch.color.as_deref(),
                    self.now_ms(),
                    lineage_id.as_str(),
                ],
            )
            .map_err(|err| write_error(err, Some(lineage_id.to_string()), None))
    }

    fn delete_document(&mut self, id: DocumentId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", rusqlite::params![id.as_raw()])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("document {id}")));
        }
        Ok(())
    }

    fn delete_documents_by_ids(&mut self, ids: &[DocumentId]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        for id in ids {
            removed += tx.execute(
                "DELETE FROM documents WHERE id = ?1",
                rusqlite::params![id.as_raw()],
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }
}
