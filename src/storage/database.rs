//! SQLite document store
//!
//! Holds the durable record of each document's state machine plus an
//! append-only processing log. Status updates are partial: text and parsed
//! fields are only written when supplied, so a completed document never loses
//! its extracted text to a later update.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::document::{DocumentRecord, DocumentStatus, FileType, ProcessingLogEntry};

/// SQLite-backed document store
///
/// Cheap to clone; all clones share one connection behind a mutex, which
/// keeps reads safe from any task while the worker owns all mutation.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("failed to create data dir: {}", e)))?;
        }
        let conn = Connection::open(path)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL keeps concurrent status reads from blocking on worker writes
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                status TEXT NOT NULL,
                raw_text TEXT,
                parsed_data TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);

            CREATE TABLE IF NOT EXISTS processing_logs (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                detail TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_processing_logs_document_id
                ON processing_logs(document_id);
        "#,
        )?;

        Ok(())
    }

    /// Check that the database answers queries (used by the health endpoint)
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Create a new document in `pending` status
    pub fn create(&self, file_name: &str, file_type: FileType, file_size: u64) -> Result<DocumentRecord> {
        let now = Utc::now();
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            file_type,
            file_size,
            status: DocumentStatus::Pending,
            raw_text: None,
            parsed_data: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        {
            let conn = self.conn.lock();
            conn.execute(
                r#"
                INSERT INTO documents (id, file_name, file_type, file_size, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.id.to_string(),
                    record.file_name,
                    record.file_type.as_str(),
                    record.file_size as i64,
                    record.status.as_str(),
                    record.created_at,
                    record.updated_at,
                ],
            )?;
        }

        self.append_log(
            &record.id,
            "create_document",
            DocumentStatus::Pending,
            Some(file_name),
        )?;

        Ok(record)
    }

    /// Update a document's status
    ///
    /// Partial update: `raw_text` and `parsed_data` keep their stored value
    /// when `None` is supplied. `error_message` is always overwritten, which
    /// maintains the invariant that it is present exactly on failed
    /// documents. Every call appends an `update_status` log entry.
    pub fn update_status(
        &self,
        document_id: &Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
        raw_text: Option<&str>,
        parsed_data: Option<&serde_json::Value>,
    ) -> Result<()> {
        let parsed_json = parsed_data.map(|v| v.to_string());
        let updated = {
            let conn = self.conn.lock();
            conn.execute(
                r#"
                UPDATE documents
                SET status = ?1,
                    error_message = ?2,
                    raw_text = COALESCE(?3, raw_text),
                    parsed_data = COALESCE(?4, parsed_data),
                    updated_at = ?5
                WHERE id = ?6
                "#,
                params![
                    status.as_str(),
                    error_message,
                    raw_text,
                    parsed_json,
                    Utc::now(),
                    document_id.to_string(),
                ],
            )?
        };

        if updated == 0 {
            return Err(Error::DocumentNotFound(document_id.to_string()));
        }

        self.append_log(document_id, "update_status", status, error_message)?;
        Ok(())
    }

    /// Fetch a document by id
    pub fn get(&self, document_id: &Uuid) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                r#"
                SELECT id, file_name, file_type, file_size, status,
                       raw_text, parsed_data, error_message, created_at, updated_at
                FROM documents WHERE id = ?1
                "#,
                params![document_id.to_string()],
                row_to_document,
            )
            .optional()?;
        Ok(record)
    }

    /// Append an entry to the processing audit log
    pub fn append_log(
        &self,
        document_id: &Uuid,
        action: &str,
        status: DocumentStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO processing_logs (id, document_id, action, status, detail, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                Uuid::new_v4().to_string(),
                document_id.to_string(),
                action,
                status.as_str(),
                detail,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Processing log entries for a document, oldest first
    pub fn logs(&self, document_id: &Uuid) -> Result<Vec<ProcessingLogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, document_id, action, status, detail, created_at
            FROM processing_logs WHERE document_id = ?1
            ORDER BY rowid
            "#,
        )?;

        let entries = stmt
            .query_map(params![document_id.to_string()], row_to_log_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let id: String = row.get(0)?;
    let file_type: String = row.get(2)?;
    let file_size: i64 = row.get(3)?;
    let status: String = row.get(4)?;
    let parsed_data: Option<String> = row.get(6)?;
    let created_at: DateTime<Utc> = row.get(8)?;
    let updated_at: DateTime<Utc> = row.get(9)?;

    Ok(DocumentRecord {
        id: parse_uuid(0, &id)?,
        file_name: row.get(1)?,
        file_type: FileType::parse(&file_type).ok_or_else(|| invalid_column(2, &file_type))?,
        file_size: file_size as u64,
        status: DocumentStatus::parse(&status).ok_or_else(|| invalid_column(4, &status))?,
        raw_text: row.get(5)?,
        // tolerate a corrupt blob rather than failing the whole read
        parsed_data: parsed_data.and_then(|s| serde_json::from_str(&s).ok()),
        error_message: row.get(7)?,
        created_at,
        updated_at,
    })
}

fn row_to_log_entry(row: &Row<'_>) -> rusqlite::Result<ProcessingLogEntry> {
    let id: String = row.get(0)?;
    let document_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    let created_at: DateTime<Utc> = row.get(5)?;

    Ok(ProcessingLogEntry {
        id: parse_uuid(0, &id)?,
        document_id: parse_uuid(1, &document_id)?,
        action: row.get(2)?,
        status: DocumentStatus::parse(&status).ok_or_else(|| invalid_column(3, &status))?,
        detail: row.get(4)?,
        created_at,
    })
}

fn parse_uuid(column: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn invalid_column(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unrecognized value: {}", value),
        )),
    )
}
