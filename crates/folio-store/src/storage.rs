//! The note storage service boundary.
//!
//! [`NoteStorage`] is the only async seam in Folio: the editor core is
//! synchronous and hands complete records to the store. `blocks` travels as
//! raw JSON so that loading can repair whatever the store holds (see
//! [`folio_doc::wire`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_types::NoteId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreResult;

/// One stored note.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub title: String,
    /// Plain text body (block texts joined by newlines).
    pub text: String,
    /// Serialized block array; absent for notes saved without blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Value>,
}

/// Loads and saves whole notes.
#[async_trait]
pub trait NoteStorage: Send + Sync {
    /// Fetch a note. `Ok(None)` means no such note yet.
    async fn load(&self, note_id: &NoteId) -> StoreResult<Option<NoteRecord>>;

    /// Create or replace a note.
    async fn save(&self, note_id: &NoteId, record: NoteRecord) -> StoreResult<()>;
}

/// In-process store, for tests and scratch sessions.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: Mutex<HashMap<NoteId, NoteRecord>>,
    saves: AtomicUsize,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a note without counting it as a save.
    pub fn insert(&self, note_id: NoteId, record: NoteRecord) {
        self.notes.lock().insert(note_id, record);
    }

    pub fn get(&self, note_id: &NoteId) -> Option<NoteRecord> {
        self.notes.lock().get(note_id).cloned()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NoteStorage for MemoryNoteStore {
    async fn load(&self, note_id: &NoteId) -> StoreResult<Option<NoteRecord>> {
        Ok(self.get(note_id))
    }

    async fn save(&self, note_id: &NoteId, record: NoteRecord) -> StoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.notes.lock().insert(note_id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryNoteStore::new();
        let id = NoteId::from("n1");
        assert!(store.load(&id).await.unwrap().is_none());

        let record = NoteRecord {
            title: "Hello".into(),
            text: "body".into(),
            blocks: Some(json!([])),
        };
        store.save(&id, record.clone()).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(record));
        assert_eq!(store.save_count(), 1);

        store.insert(NoteId::from("n2"), NoteRecord::default());
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_record_without_blocks() {
        let record: NoteRecord = serde_json::from_str(r#"{"title": "t", "text": "x"}"#).unwrap();
        assert!(record.blocks.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("blocks").is_none());
    }
}
