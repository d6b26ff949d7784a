//! SQLite note store.
//!
//! One row per note. `blocks` is stored as JSON text and parsed on load; a
//! row whose `blocks` no longer parses loads with `blocks: None`, so the
//! session falls back to the plain `text` column.

use std::path::Path;

use async_trait::async_trait;
use folio_types::NoteId;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreResult;
use crate::storage::{NoteRecord, NoteStorage};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    text TEXT NOT NULL DEFAULT '',
    blocks TEXT,
    updated_at INTEGER DEFAULT (unixepoch())
);
CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at);
"#;

/// Summary row for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    /// Unix seconds.
    pub updated_at: i64,
}

/// Note store backed by a single SQLite connection.
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// All notes, most recently updated first.
    pub fn list(&self) -> StoreResult<Vec<NoteSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, title, updated_at FROM notes ORDER BY updated_at DESC, id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            Ok(NoteSummary {
                id: NoteId::from(id),
                title: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        let summaries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn load_sync(&self, note_id: &NoteId) -> StoreResult<Option<NoteRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT title, text, blocks FROM notes WHERE id = ?1",
                params![note_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(title, text, blocks)| {
            let blocks = blocks.and_then(|raw| match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(note = %note_id, error = %err, "stored blocks are not valid JSON");
                    None
                }
            });
            NoteRecord { title, text, blocks }
        }))
    }

    fn save_sync(&self, note_id: &NoteId, record: &NoteRecord) -> StoreResult<()> {
        let blocks = record.blocks.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO notes (id, title, text, blocks, updated_at)
             VALUES (?1, ?2, ?3, ?4, unixepoch())
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                blocks = excluded.blocks,
                updated_at = excluded.updated_at",
            params![note_id.as_str(), record.title, record.text, blocks],
        )?;
        Ok(())
    }
}

#[async_trait]
impl NoteStorage for SqliteNoteStore {
    #[tracing::instrument(skip_all, fields(note = %note_id))]
    async fn load(&self, note_id: &NoteId) -> StoreResult<Option<NoteRecord>> {
        self.load_sync(note_id)
    }

    #[tracing::instrument(skip_all, fields(note = %note_id))]
    async fn save(&self, note_id: &NoteId, record: NoteRecord) -> StoreResult<()> {
        self.save_sync(note_id, &record)
    }
}
