//! Cursor and selection bookkeeping.
//!
//! The editor core never owns a live caret. Callers pass the current
//! [`CursorState`] into each command (or `None` when focus left the blocks,
//! e.g. a toolbar click), and the [`SelectionTracker`] falls back to the last
//! selection it saw. Commands hand back a focus target for the caller to
//! apply to its widgets.
//!
//! Offsets are chars, like everything else in a block.

use folio_types::BlockId;
use serde::{Deserialize, Serialize};

use crate::document::BlockDocument;

/// A caret or selection inside one block. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// The block containing the cursor.
    pub block_id: BlockId,
    /// Char offset of the caret (selection anchor).
    pub offset: usize,
    /// Other end of the selection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_end: Option<usize>,
}

impl CursorState {
    /// A collapsed caret.
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self {
            block_id,
            offset,
            selection_end: None,
        }
    }

    /// A selection from `start` to `end`.
    pub fn with_selection(block_id: BlockId, start: usize, end: usize) -> Self {
        Self {
            block_id,
            offset: start,
            selection_end: Some(end),
        }
    }

    /// Ordered `(start, end)`; equal when collapsed.
    pub fn range(&self) -> (usize, usize) {
        match self.selection_end {
            Some(end) if end < self.offset => (end, self.offset),
            Some(end) => (self.offset, end),
            None => (self.offset, self.offset),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        let (start, end) = self.range();
        start == end
    }

    /// Selected char count.
    pub fn selected_len(&self) -> usize {
        let (start, end) = self.range();
        end - start
    }

    /// Same cursor with both ends clamped to `len`.
    pub fn clamp(&self, len: usize) -> Self {
        Self {
            block_id: self.block_id,
            offset: self.offset.min(len),
            selection_end: self.selection_end.map(|e| e.min(len)),
        }
    }

    /// Collapse to the start of the selection.
    pub fn collapse_to_start(&self) -> Self {
        Self::new(self.block_id, self.range().0)
    }

    /// Transform cursor position based on an edit in the same block.
    ///
    /// # Arguments
    /// * `edit_offset` - Where the edit occurred
    /// * `deleted` - Number of chars deleted at edit_offset
    /// * `inserted` - Number of chars inserted at edit_offset
    pub fn transform(&mut self, edit_offset: usize, deleted: usize, inserted: usize) {
        self.offset = transform_offset(self.offset, edit_offset, deleted, inserted);
        if let Some(ref mut end) = self.selection_end {
            *end = transform_offset(*end, edit_offset, deleted, inserted);
        }
    }

    /// Backspace/Delete should act on the whole block.
    ///
    /// True when the selection covers at least `ratio` of a non-empty block
    /// (never less than one char), or exactly the whole block.
    pub fn is_large_selection(&self, block_len: usize, ratio: f64) -> bool {
        if self.is_collapsed() || block_len == 0 {
            return false;
        }
        let (start, end) = self.range();
        if start == 0 && end == block_len {
            return true;
        }
        let threshold = (block_len as f64 * ratio).max(1.0);
        (end - start) as f64 >= threshold
    }
}

/// Transform a single offset based on an edit operation.
pub fn transform_offset(offset: usize, edit_offset: usize, deleted: usize, inserted: usize) -> usize {
    if offset <= edit_offset {
        // Before the edit, unchanged
        offset
    } else if offset <= edit_offset + deleted {
        // Within the deleted region, move to edit point
        edit_offset + inserted
    } else {
        offset - deleted + inserted
    }
}

/// Editor tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Fraction of a block that counts as a "large" selection.
    pub large_selection_ratio: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            large_selection_ratio: 0.5,
        }
    }
}

/// Remembers the last observed selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    last: Option<CursorState>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last known selection, if any.
    pub fn last(&self) -> Option<&CursorState> {
        self.last.as_ref()
    }

    /// Record a selection reported by the caller or produced by a command.
    pub fn observe(&mut self, cursor: CursorState) {
        self.last = Some(cursor);
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Resolve the selection a command should act on.
    ///
    /// Prefers `current`; falls back to the last known selection. A selection
    /// in a block that no longer exists is dropped. The result is clamped to
    /// the block's text and remembered.
    pub fn resolve(
        &mut self,
        current: Option<CursorState>,
        doc: &BlockDocument,
    ) -> Option<CursorState> {
        let candidate = current.or_else(|| self.last.clone())?;
        match doc.block(&candidate.block_id) {
            Some(block) => {
                let resolved = candidate.clamp(block.char_len());
                self.last = Some(resolved.clone());
                Some(resolved)
            }
            None => {
                tracing::debug!(block = %candidate.block_id, "selection refers to a removed block, dropping");
                if self.last.as_ref().map(|c| c.block_id) == Some(candidate.block_id) {
                    self.last = None;
                }
                None
            }
        }
    }

    /// Keep the remembered selection in step with a text edit.
    pub fn transform(&mut self, block_id: &BlockId, edit_offset: usize, deleted: usize, inserted: usize) {
        if let Some(cursor) = self.last.as_mut()
            && &cursor.block_id == block_id
        {
            cursor.transform(edit_offset, deleted, inserted);
        }
    }

    /// Drop the remembered selection if it points into `block_id`.
    pub fn forget_block(&mut self, block_id: &BlockId) {
        if self.last.as_ref().is_some_and(|c| &c.block_id == block_id) {
            self.last = None;
        }
    }
}
