//! Document change records.
//!
//! Every successful mutation of a [`BlockDocument`](crate::BlockDocument)
//! returns a [`DocChange`] describing what happened. Callers use them to
//! drive focus, logging, and the save scheduler; they are not replayable.

use folio_types::{Alignment, BlockId, BlockKind, FormatKind};
use serde::Serialize;

/// What a single document mutation did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum DocChange {
    /// A new block was inserted.
    ///
    /// `tail` is set when the insertion split a text block: it holds the
    /// paragraph carrying the text after the cursor.
    Inserted {
        id: BlockId,
        index: usize,
        tail: Option<BlockId>,
    },

    /// A text block was split; `created` holds the text after the cursor.
    Split { source: BlockId, created: BlockId },

    /// An empty list item was converted to a paragraph instead of split.
    ListExited { id: BlockId },

    /// `removed` was appended to `into` and deleted. The caret belongs at
    /// `join_offset` in `into`.
    Merged {
        into: BlockId,
        removed: BlockId,
        join_offset: usize,
    },

    /// A block was deleted. `replacement` is the fresh empty paragraph that
    /// took its place when it was the only block.
    Deleted {
        id: BlockId,
        index: usize,
        replacement: Option<BlockId>,
    },

    /// Kind changed.
    Retyped {
        id: BlockId,
        from: BlockKind,
        to: BlockKind,
    },

    /// Alignment changed.
    Realigned { id: BlockId, alignment: Alignment },

    /// Block moved from one index to another.
    Moved { id: BlockId, from: usize, to: usize },

    /// Chars `[start, start + deleted)` replaced by `inserted` chars.
    TextEdited {
        id: BlockId,
        start: usize,
        deleted: usize,
        inserted: usize,
    },

    /// A format span was toggled on or off.
    FormatToggled {
        id: BlockId,
        kind: FormatKind,
        enabled: bool,
    },

    /// The block payload was replaced or edited.
    PayloadUpdated { id: BlockId },
}

impl DocChange {
    /// The block this change is about.
    pub fn target_block(&self) -> &BlockId {
        match self {
            DocChange::Inserted { id, .. } => id,
            DocChange::Split { source, .. } => source,
            DocChange::ListExited { id } => id,
            DocChange::Merged { into, .. } => into,
            DocChange::Deleted { id, .. } => id,
            DocChange::Retyped { id, .. } => id,
            DocChange::Realigned { id, .. } => id,
            DocChange::Moved { id, .. } => id,
            DocChange::TextEdited { id, .. } => id,
            DocChange::FormatToggled { id, .. } => id,
            DocChange::PayloadUpdated { id } => id,
        }
    }

    /// Check if this change added, removed, or reordered blocks.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DocChange::Inserted { .. }
                | DocChange::Split { .. }
                | DocChange::Merged { .. }
                | DocChange::Deleted { .. }
                | DocChange::Moved { .. }
        )
    }

    /// Check if this is a text edit.
    pub fn is_text_edit(&self) -> bool {
        matches!(self, DocChange::TextEdited { .. })
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DocChange::Inserted { .. } => "inserted",
            DocChange::Split { .. } => "split",
            DocChange::ListExited { .. } => "list_exited",
            DocChange::Merged { .. } => "merged",
            DocChange::Deleted { .. } => "deleted",
            DocChange::Retyped { .. } => "retyped",
            DocChange::Realigned { .. } => "realigned",
            DocChange::Moved { .. } => "moved",
            DocChange::TextEdited { .. } => "text_edited",
            DocChange::FormatToggled { .. } => "format_toggled",
            DocChange::PayloadUpdated { .. } => "payload_updated",
        }
    }
}
