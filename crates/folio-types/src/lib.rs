//! Shared identity, block, and payload types for Folio.
//!
//! This is the leaf crate of the workspace: typed IDs, the closed set of block
//! kinds, inline format spans, and the kind-specific payloads carried by
//! table/image/calendar/checklist blocks. It has no internal folio
//! dependencies.
//!
//! ```text
//! Note (NoteId)
//!     └── ordered Blocks (BlockId)
//!             ├── text-bearing kinds: text + FormatSpans
//!             ├── payload kinds: Payload (table, image, calendar, checklist)
//!             └── divider: neither
//! ```
//!
//! # Key Types
//!
//! |-------------------|-----------------------------------------------|
//! | Type              | Purpose                                       |
//! |-------------------|-----------------------------------------------|
//! | [`NoteId`]        | Which note (issued by the storage service)    |
//! | [`BlockId`]       | Which block (UUIDv7, unique per document)     |
//! | [`BlockKind`]     | Paragraph, heading, list item, table, ...     |
//! | [`FormatSpan`]    | `[start, end)` char range + bold/italic/...   |
//! | [`Block`]         | One block: kind, text, spans, alignment, data |
//! | [`Payload`]       | Kind-specific data for non-text blocks        |
//! | [`PayloadEdit`]   | One edit against a payload                    |
//! |-------------------|-----------------------------------------------|

pub mod block;
pub mod ids;
pub mod payload;

pub use block::{Alignment, Block, BlockKind, FormatKind, FormatSpan};
pub use ids::{BlockId, IdError, NoteId};
pub use payload::{
    CalendarEvent, CalendarPayload, CalendarView, ChecklistItem, ChecklistPayload, EventType,
    ImagePayload, ImageSize, Payload, PayloadEdit, PayloadError, TablePayload, default_payload,
};
