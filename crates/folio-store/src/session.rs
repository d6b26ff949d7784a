//! One open note: an [`Editor`] plus the [`SaveScheduler`] that persists it.
//!
//! The session is the only place that knows about both halves. Every
//! mutation that changes the document is forwarded to the scheduler as a new
//! [`Draft`]; a `Save` command flushes immediately.

use std::sync::Arc;

use folio_doc::{wire, BlockDocument, Command, CommandOutcome, CursorState, DocChange, Editor};
use folio_types::{BlockId, NoteId};
use tokio::sync::broadcast;

use crate::config::FolioConfig;
use crate::error::StoreResult;
use crate::scheduler::{Draft, SaveEvent, SaveOutcome, SaveScheduler};
use crate::storage::NoteStorage;

/// An open note.
pub struct NoteSession {
    editor: Editor,
    title: String,
    scheduler: SaveScheduler,
}

impl NoteSession {
    /// Load `note_id` (or start a new note if the store has none).
    ///
    /// Stored blocks are repaired on load; a note without usable blocks opens
    /// as a single paragraph holding its plain text.
    #[tracing::instrument(skip_all, fields(note = %note_id))]
    pub async fn open(
        storage: Arc<dyn NoteStorage>,
        note_id: NoteId,
        config: &FolioConfig,
    ) -> StoreResult<Self> {
        let record = storage.load(&note_id).await?;
        let is_new = record.is_none();

        let (title, blocks) = match record {
            Some(record) => {
                let blocks = wire::load_blocks(record.blocks.as_ref(), &record.text);
                (record.title, blocks)
            }
            None => (String::new(), Vec::new()),
        };
        let doc = BlockDocument::from_blocks(note_id.clone(), blocks);
        tracing::debug!(blocks = doc.block_count(), is_new, "note opened");

        let scheduler = SaveScheduler::new(note_id, storage, config.save.clone(), is_new);
        if !is_new {
            scheduler.set_baseline(&Draft::from_document(title.as_str(), &doc))?;
        }

        Ok(Self {
            editor: Editor::new(doc, config.editor.clone()),
            title,
            scheduler,
        })
    }

    pub fn note_id(&self) -> &NoteId {
        self.scheduler.note_id()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn doc(&self) -> &BlockDocument {
        self.editor.doc()
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.scheduler.subscribe()
    }

    /// Run a command. Mutations schedule a save; a save request flushes now.
    pub async fn execute(
        &mut self,
        current: Option<CursorState>,
        command: Command,
    ) -> StoreResult<CommandOutcome> {
        let outcome = self.editor.execute(current, command);
        if outcome.mutated() {
            self.notify();
        }
        if outcome.save_requested {
            self.scheduler.flush().await?;
        }
        Ok(outcome)
    }

    /// Direct text edit from an input widget.
    pub fn edit_text(
        &mut self,
        id: &BlockId,
        start: usize,
        end: usize,
        inserted: &str,
    ) -> folio_doc::Result<DocChange> {
        let change = self.editor.edit_text(id, start, end, inserted)?;
        self.notify();
        Ok(change)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if title != self.title {
            self.title = title;
            self.notify();
        }
    }

    /// Flush pending changes now.
    pub async fn save(&self) -> StoreResult<SaveOutcome> {
        self.scheduler.flush().await
    }

    fn notify(&self) {
        self.scheduler
            .notify_mutation(Draft::from_document(self.title.as_str(), self.editor.doc()));
    }
}
