//! Keyboard and toolbar commands.
//!
//! An [`Editor`] owns one [`BlockDocument`] plus the selection tracker and
//! turns [`Command`]s into document mutations. Every command returns a
//! [`CommandOutcome`] with the changes made and where the caret should go
//! next. Commands never fail: a rejected mutation is logged at `debug` and
//! reported as an outcome with no changes.

use folio_types::{Alignment, BlockId, BlockKind, FormatKind, Payload, PayloadEdit};
use serde::{Deserialize, Serialize};

use crate::cursor::{CursorState, EditorConfig, SelectionTracker};
use crate::document::{BlockDocument, DocumentSnapshot};
use crate::ops::DocChange;
use crate::text;
use crate::Result;

/// A user-level editing command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Split the block at the caret (deleting any selection first).
    Enter,
    Backspace,
    Delete,
    /// Move to the end of the previous block when at offset 0.
    ArrowUp,
    /// Move to the start of the next block when at the end.
    ArrowDown,
    /// Type or paste, replacing the selection.
    InsertText { text: String },
    ToggleFormat { kind: FormatKind },
    SetAlignment { alignment: Alignment },
    Retype { kind: BlockKind },
    InsertBlock {
        kind: BlockKind,
        #[serde(skip)]
        payload: Option<Payload>,
    },
    /// Drag-and-drop completion, by block index.
    Reorder { from: usize, to: usize },
    EditPayload { edit: PayloadEdit },
    /// Explicit save request; the session flushes immediately.
    Save,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Enter => "enter",
            Command::Backspace => "backspace",
            Command::Delete => "delete",
            Command::ArrowUp => "arrow_up",
            Command::ArrowDown => "arrow_down",
            Command::InsertText { .. } => "insert_text",
            Command::ToggleFormat { .. } => "toggle_format",
            Command::SetAlignment { .. } => "set_alignment",
            Command::Retype { .. } => "retype",
            Command::InsertBlock { .. } => "insert_block",
            Command::Reorder { .. } => "reorder",
            Command::EditPayload { .. } => "edit_payload",
            Command::Save => "save",
        }
    }
}

/// Result of executing one command.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommandOutcome {
    /// Document changes, in the order they were applied.
    pub changes: Vec<DocChange>,
    /// Where the caret belongs now. `None` leaves focus to the caller.
    pub focus: Option<CursorState>,
    /// The command asked for an immediate save.
    pub save_requested: bool,
    /// The full block list after the command, when it changed anything.
    pub snapshot: Option<DocumentSnapshot>,
}

impl CommandOutcome {
    fn noop() -> Self {
        Self::default()
    }

    fn focus(cursor: CursorState) -> Self {
        Self {
            focus: Some(cursor),
            ..Self::default()
        }
    }

    fn changed(changes: Vec<DocChange>, focus: Option<CursorState>) -> Self {
        Self {
            changes,
            focus,
            ..Self::default()
        }
    }

    /// The document was modified.
    pub fn mutated(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Editing session over one document.
#[derive(Debug, Clone)]
pub struct Editor {
    doc: BlockDocument,
    selection: SelectionTracker,
    config: EditorConfig,
}

impl Editor {
    pub fn new(doc: BlockDocument, config: EditorConfig) -> Self {
        Self {
            doc,
            selection: SelectionTracker::new(),
            config,
        }
    }

    pub fn doc(&self) -> &BlockDocument {
        &self.doc
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.doc.snapshot()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The last known selection.
    pub fn selection(&self) -> Option<&CursorState> {
        self.selection.last()
    }

    /// Record where the caret is without running a command.
    pub fn observe(&mut self, cursor: CursorState) {
        self.selection.observe(cursor);
    }

    /// Format kinds active at the current (or last known) selection.
    pub fn active_formats(&mut self, current: Option<CursorState>) -> Vec<FormatKind> {
        match self.selection.resolve(current, &self.doc) {
            Some(cursor) => self.doc.active_formats(&cursor),
            None => Vec::new(),
        }
    }

    /// Direct text edit from an input widget (outside the command set).
    ///
    /// The remembered selection is transformed to follow the edit.
    pub fn edit_text(
        &mut self,
        id: &BlockId,
        start: usize,
        end: usize,
        inserted: &str,
    ) -> Result<DocChange> {
        let change = self.doc.edit_text(id, start, end, inserted)?;
        if let DocChange::TextEdited { start, deleted, inserted, .. } = change {
            self.selection.transform(id, start, deleted, inserted);
        }
        Ok(change)
    }

    /// Run a command against the current (or last known) selection.
    ///
    /// A mutating command's outcome carries the new block list; a rejected or
    /// no-op command leaves the document and its version untouched.
    pub fn execute(&mut self, current: Option<CursorState>, command: Command) -> CommandOutcome {
        let cursor = self.selection.resolve(current, &self.doc);
        let name = command.name();
        match self.dispatch(cursor, command) {
            Ok(mut outcome) => {
                if let Some(focus) = &outcome.focus {
                    self.selection.observe(focus.clone());
                }
                for change in &outcome.changes {
                    if let DocChange::Deleted { id, .. } | DocChange::Merged { removed: id, .. } = change {
                        self.selection.forget_block(id);
                    }
                }
                if outcome.mutated() {
                    tracing::debug!(command = name, changes = outcome.changes.len(), version = self.doc.version(), "command applied");
                    outcome.snapshot = Some(self.doc.snapshot());
                }
                outcome
            }
            Err(err) => {
                tracing::debug!(command = name, error = %err, "command rejected");
                CommandOutcome::noop()
            }
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(&mut self, cursor: Option<CursorState>, command: Command) -> Result<CommandOutcome> {
        // Commands that work without a selection.
        match command {
            Command::Save => {
                return Ok(CommandOutcome {
                    save_requested: true,
                    ..CommandOutcome::default()
                });
            }
            Command::InsertBlock { kind, payload } => {
                let change = self.doc.insert_block(kind, cursor.as_ref(), payload)?;
                let focus = CursorState::new(*change.target_block(), 0);
                return Ok(CommandOutcome::changed(vec![change], Some(focus)));
            }
            Command::Reorder { from, to } => return self.reorder(cursor, from, to),
            _ => {}
        }

        let Some(cursor) = cursor else {
            tracing::debug!(command = command.name(), "no selection to act on");
            return Ok(CommandOutcome::noop());
        };

        match command {
            Command::Enter => self.enter(cursor),
            Command::Backspace => self.backspace(cursor),
            Command::Delete => self.delete(cursor),
            Command::ArrowUp => Ok(self.arrow_up(cursor)),
            Command::ArrowDown => Ok(self.arrow_down(cursor)),
            Command::InsertText { text } => self.insert_text(cursor, &text),
            Command::ToggleFormat { kind } => {
                let (start, end) = cursor.range();
                let change = self.doc.apply_format(&cursor.block_id, kind, start, end)?;
                Ok(CommandOutcome::changed(change.into_iter().collect(), Some(cursor)))
            }
            Command::SetAlignment { alignment } => {
                let change = self.doc.set_alignment(&cursor.block_id, alignment)?;
                Ok(CommandOutcome::changed(vec![change], Some(cursor)))
            }
            Command::Retype { kind } => {
                let change = self.doc.retype(&cursor.block_id, kind)?;
                let len = self.block_len(&cursor.block_id);
                Ok(CommandOutcome::changed(vec![change], Some(cursor.clamp(len))))
            }
            Command::EditPayload { edit } => {
                let change = self.doc.edit_payload(&cursor.block_id, &edit)?;
                Ok(CommandOutcome::changed(vec![change], Some(cursor)))
            }
            Command::Save | Command::InsertBlock { .. } | Command::Reorder { .. } => {
                Ok(CommandOutcome::noop())
            }
        }
    }

    fn block_len(&self, id: &BlockId) -> usize {
        self.doc.block(id).map(|b| b.char_len()).unwrap_or(0)
    }

    fn is_text(&self, id: &BlockId) -> bool {
        self.doc.block(id).is_some_and(|b| b.kind.is_text())
    }

    /// Caret at the end of block `id` (offset 0 for non-text blocks).
    fn end_of(&self, id: &BlockId) -> CursorState {
        CursorState::new(*id, self.block_len(id))
    }

    fn start_of(id: &BlockId) -> CursorState {
        CursorState::new(*id, 0)
    }

    fn is_large(&self, cursor: &CursorState) -> bool {
        cursor.is_large_selection(self.block_len(&cursor.block_id), self.config.large_selection_ratio)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn enter(&mut self, cursor: CursorState) -> Result<CommandOutcome> {
        let id = cursor.block_id;
        if !self.is_text(&id) {
            return Ok(CommandOutcome::noop());
        }
        let (start, end) = cursor.range();
        let mut changes = Vec::new();
        if start < end {
            changes.push(self.doc.edit_text(&id, start, end, "")?);
        }
        let change = self.doc.split_at_cursor(&id, start)?;
        let focus = match &change {
            DocChange::Split { created, .. } => Self::start_of(created),
            _ => Self::start_of(&id),
        };
        changes.push(change);
        Ok(CommandOutcome::changed(changes, Some(focus)))
    }

    /// Delete `id` as a whole, focusing the previous block's end (or the
    /// next block's start when `prefer_next` or there is no previous one).
    fn delete_whole_block(&mut self, id: &BlockId, prefer_next: bool) -> Result<CommandOutcome> {
        let previous = self.doc.previous(id).map(|b| b.id);
        let next = self.doc.next(id).map(|b| b.id);
        let change = self.doc.delete_block(id)?;
        let focus = match (&change, prefer_next, previous, next) {
            (DocChange::Deleted { replacement: Some(fresh), .. }, ..) => Self::start_of(fresh),
            (_, true, _, Some(next)) => Self::start_of(&next),
            (_, _, Some(prev), _) => self.end_of(&prev),
            (_, _, None, Some(next)) => Self::start_of(&next),
            (_, _, None, None) => Self::start_of(&self.doc.first().id),
        };
        Ok(CommandOutcome::changed(vec![change], Some(focus)))
    }

    /// Block-level Backspace/Delete for a large selection.
    fn delete_selected_block(&mut self, cursor: &CursorState, prefer_next: bool) -> Result<CommandOutcome> {
        let id = cursor.block_id;
        let is_last = self.doc.last().id == id;
        if is_last && self.block_len(&id) > 0 {
            let change = self.doc.clear_text(&id)?;
            return Ok(CommandOutcome::changed(vec![change], Some(Self::start_of(&id))));
        }
        self.delete_whole_block(&id, prefer_next)
    }

    fn backspace(&mut self, cursor: CursorState) -> Result<CommandOutcome> {
        let id = cursor.block_id;
        if !self.is_text(&id) {
            return self.delete_whole_block(&id, false);
        }
        if self.is_large(&cursor) {
            return self.delete_selected_block(&cursor, false);
        }

        let (start, end) = cursor.range();
        if start < end {
            let change = self.doc.edit_text(&id, start, end, "")?;
            return Ok(CommandOutcome::changed(vec![change], Some(CursorState::new(id, start))));
        }
        if start > 0 {
            let change = self.doc.edit_text(&id, start - 1, start, "")?;
            return Ok(CommandOutcome::changed(vec![change], Some(CursorState::new(id, start - 1))));
        }

        // Caret at offset 0.
        let Some(block) = self.doc.block(&id) else {
            return Ok(CommandOutcome::noop());
        };
        let empty = block.is_empty();
        let leaves_list = block.is_empty_list_item();
        let previous = self.doc.previous(&id).map(|b| (b.id, b.kind.is_text()));

        if leaves_list {
            let change = self.doc.retype(&id, BlockKind::Paragraph)?;
            return Ok(CommandOutcome::changed(vec![change], Some(cursor)));
        }
        match previous {
            None => Ok(CommandOutcome::noop()),
            Some(_) if empty => self.delete_whole_block(&id, false),
            Some((_, true)) => {
                let change = self.doc.merge_with_previous(&id)?;
                let focus = match &change {
                    DocChange::Merged { into, join_offset, .. } => CursorState::new(*into, *join_offset),
                    _ => cursor.clone(),
                };
                Ok(CommandOutcome::changed(vec![change], Some(focus)))
            }
            Some((prev, false)) => {
                let change = self.doc.delete_block(&prev)?;
                Ok(CommandOutcome::changed(vec![change], Some(cursor)))
            }
        }
    }

    fn delete(&mut self, cursor: CursorState) -> Result<CommandOutcome> {
        let id = cursor.block_id;
        if !self.is_text(&id) {
            return self.delete_whole_block(&id, true);
        }
        if self.is_large(&cursor) {
            return self.delete_selected_block(&cursor, true);
        }

        let (start, end) = cursor.range();
        if start < end {
            let change = self.doc.edit_text(&id, start, end, "")?;
            return Ok(CommandOutcome::changed(vec![change], Some(CursorState::new(id, start))));
        }

        let len = self.block_len(&id);
        if start < len {
            let change = self.doc.edit_text(&id, start, start + 1, "")?;
            return Ok(CommandOutcome::changed(vec![change], Some(cursor)));
        }

        let next_is_text = self.doc.next(&id).is_some_and(|b| b.kind.is_text());
        if !next_is_text {
            return Ok(CommandOutcome::noop());
        }
        let change = self.doc.merge_with_next(&id)?;
        let focus = match &change {
            DocChange::Merged { into, join_offset, .. } => CursorState::new(*into, *join_offset),
            _ => cursor.clone(),
        };
        Ok(CommandOutcome::changed(vec![change], Some(focus)))
    }

    fn arrow_up(&self, cursor: CursorState) -> CommandOutcome {
        if cursor.range().0 != 0 {
            return CommandOutcome::noop();
        }
        match self.doc.previous(&cursor.block_id) {
            Some(prev) => CommandOutcome::focus(self.end_of(&prev.id)),
            None => CommandOutcome::noop(),
        }
    }

    fn arrow_down(&self, cursor: CursorState) -> CommandOutcome {
        if cursor.range().1 < self.block_len(&cursor.block_id) {
            return CommandOutcome::noop();
        }
        match self.doc.next(&cursor.block_id) {
            Some(next) => CommandOutcome::focus(Self::start_of(&next.id)),
            None => CommandOutcome::noop(),
        }
    }

    fn insert_text(&mut self, cursor: CursorState, inserted: &str) -> Result<CommandOutcome> {
        let (start, end) = cursor.range();
        if start == end && inserted.is_empty() {
            return Ok(CommandOutcome::noop());
        }
        let change = self.doc.edit_text(&cursor.block_id, start, end, inserted)?;
        let focus = CursorState::new(cursor.block_id, start + text::char_len(inserted));
        Ok(CommandOutcome::changed(vec![change], Some(focus)))
    }

    fn reorder(&mut self, cursor: Option<CursorState>, from: usize, to: usize) -> Result<CommandOutcome> {
        let Some(block) = self.doc.blocks().get(from) else {
            tracing::debug!(from, to, "reorder source out of range");
            return Ok(CommandOutcome::noop());
        };
        let id = block.id;
        if from == to.min(self.doc.block_count() - 1) {
            return Ok(CommandOutcome::noop());
        }
        let change = self.doc.reorder(&id, to)?;
        Ok(CommandOutcome::changed(vec![change], cursor))
    }
}
