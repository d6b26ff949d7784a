//! Persistence for Folio notes.
//!
//! - [`NoteStorage`]: async load/save of whole notes, with an in-memory
//!   ([`MemoryNoteStore`]) and a SQLite ([`SqliteNoteStore`]) backend
//! - [`SaveScheduler`]: debounced, single-flight saving with dirty tracking
//! - [`NoteSession`]: an open note wiring an editor to its scheduler
//! - [`FolioConfig`]: editor and save settings loaded from RON

pub mod config;
pub mod db;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use config::FolioConfig;
pub use db::{NoteSummary, SqliteNoteStore};
pub use error::{ConfigError, StoreError, StoreResult};
pub use scheduler::{Draft, SaveConfig, SaveEvent, SaveOutcome, SaveScheduler, SkipReason, UNTITLED};
pub use session::NoteSession;
pub use storage::{MemoryNoteStore, NoteRecord, NoteStorage};
