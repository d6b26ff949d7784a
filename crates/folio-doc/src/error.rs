//! Error types for document operations.

use folio_types::{BlockId, BlockKind, PayloadError};
use thiserror::Error;

/// Errors that can occur while mutating a [`BlockDocument`](crate::BlockDocument).
///
/// Every mutation validates before it touches anything, so an error always
/// means the document is unchanged.
#[derive(Error, Debug)]
pub enum DocError {
    /// Block not found in document.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Char offset past the end of the block's text.
    #[error("offset {offset} out of bounds for block with length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// Char range inverted or past the end of the block's text.
    #[error("range {start}..{end} out of bounds for block with length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// Text operation on a divider or payload block.
    #[error("block {id:?} ({kind}) has no editable text")]
    NotTextBlock { id: BlockId, kind: BlockKind },

    /// Backward merge from the first block, or into a non-text block.
    #[error("block {0:?} has no text block before it to merge into")]
    NoPreviousBlock(BlockId),

    /// Forward merge from the last block, or of a non-text block.
    #[error("block {0:?} has no text block after it to merge")]
    NoNextBlock(BlockId),

    /// Payload of the wrong shape for the block's kind.
    #[error("payload for {payload} does not fit block {id:?} ({kind})")]
    PayloadMismatch {
        id: BlockId,
        kind: BlockKind,
        payload: BlockKind,
    },

    /// A payload edit was rejected.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}
