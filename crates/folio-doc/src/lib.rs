//! Block document model and editing core for Folio.
//!
//! A note is an ordered list of blocks. Text-bearing blocks carry inline
//! format spans; table/image/calendar/checklist blocks carry a payload. This
//! crate owns everything between a keystroke and a new document snapshot:
//!
//! - **format**: span toggling, span adjustment on text edits, rendering to
//!   display segments
//! - **document**: the block list and its structural operations
//! - **cursor**: caret/selection values and the last-known-selection tracker
//! - **commands**: Enter/Backspace/Delete/arrows/toolbar mapped onto the model
//! - **wire**: the block array exchanged with the storage service
//!
//! Persistence and debounced saving live in `folio-store`.
//!
//! # Offsets
//!
//! Every offset is a char (Unicode scalar) index into a block's text, never a
//! byte index, so no edit can split a code point.

pub mod commands;
pub mod cursor;
mod document;
mod error;
pub mod format;
pub mod markdown;
mod ops;
pub mod text;
pub mod wire;

pub use commands::{Command, CommandOutcome, Editor};
pub use cursor::{CursorState, EditorConfig, SelectionTracker};
pub use document::{BlockDocument, DocumentSnapshot};
pub use error::DocError;
pub use format::Segment;
pub use ops::DocChange;
pub use wire::WireError;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
