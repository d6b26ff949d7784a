//! Debounced note saving.
//!
//! Every accepted mutation hands the scheduler a fresh [`Draft`] and restarts
//! a debounce timer. When the timer fires (or on an explicit
//! [`SaveScheduler::flush`]) the latest draft is encoded and written through
//! the [`NoteStorage`]. At most one save runs at a time; mutations that
//! arrive while it is in flight keep the note dirty and re-arm the timer once
//! it completes.
//!
//! ```text
//! notify_mutation ──► dirty, revision += 1, timer restarted
//!                         │ (debounce elapses)
//!                         ▼
//!            save_now ──► skip? ──► storage.save ──► Saved / Failed event
//! ```
//!
//! A failed save leaves the note dirty and is reported once (return value and
//! [`SaveEvent::Failed`]). It is not retried until the next mutation or an
//! explicit flush.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_doc::{wire, BlockDocument};
use folio_types::{Block, NoteId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::StoreResult;
use crate::storage::{NoteRecord, NoteStorage};

/// Title stored for notes saved without one.
pub const UNTITLED: &str = "Untitled";

const EVENT_CAPACITY: usize = 16;

/// Save timing and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Quiet period after the last mutation before saving.
    pub debounce_ms: u64,
    /// Save automatically after the debounce. When false only explicit
    /// flushes save.
    pub autosave: bool,
    /// A brand new, untitled note is not saved until its content digest has
    /// at least this many chars.
    pub min_content_chars: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 5000,
            autosave: true,
            min_content_chars: 4,
        }
    }
}

impl SaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Note content at one point in time, as handed over by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub title: String,
    pub blocks: Vec<Block>,
    /// Block texts joined by newlines.
    pub text: String,
    /// See [`BlockDocument::content_digest`].
    pub digest: String,
}

impl Draft {
    pub fn from_document(title: impl Into<String>, doc: &BlockDocument) -> Self {
        Self {
            title: title.into(),
            blocks: doc.blocks().to_vec(),
            text: doc.full_text(),
            digest: doc.content_digest(),
        }
    }

    /// The record to store, plus its canonical JSON for change detection.
    fn encode(&self) -> StoreResult<(NoteRecord, String)> {
        let title = if self.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            self.title.clone()
        };
        let record = NoteRecord {
            title,
            text: self.text.clone(),
            blocks: Some(wire::serialize_blocks(&self.blocks)?),
        };
        let fingerprint = serde_json::to_string(&record)?;
        Ok((record, fingerprint))
    }
}

/// Why a flush did not write anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing changed since the last save.
    Clean,
    /// Content identical to what was last saved.
    Unchanged,
    /// New untitled note with too little content to be worth keeping.
    BelowMinimum,
}

/// What a flush did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another save is running; this one was dropped.
    InFlight,
    Skipped(SkipReason),
}

/// Broadcast after every attempted write.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    Saved { note_id: NoteId, at: DateTime<Utc> },
    Failed { note_id: NoteId, error: String },
}

#[derive(Default)]
struct SaveState {
    draft: Option<Draft>,
    dirty: bool,
    saving: bool,
    /// Bumped on every mutation.
    revision: u64,
    last_saved_snapshot: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    /// Never saved yet.
    is_new: bool,
    timer: Option<JoinHandle<()>>,
}

/// Clears `saving` if a save future is dropped before the store answers.
/// The note stays dirty, so the next flush writes it.
struct SavingGuard<'a> {
    state: &'a Mutex<SaveState>,
    armed: bool,
}

impl<'a> SavingGuard<'a> {
    fn new(state: &'a Mutex<SaveState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().saving = false;
            tracing::debug!("save cancelled before the store answered");
        }
    }
}

struct Inner {
    note_id: NoteId,
    storage: Arc<dyn NoteStorage>,
    config: SaveConfig,
    state: Mutex<SaveState>,
    events: broadcast::Sender<SaveEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

/// Debounced saver for one note. Cheap to clone.
#[derive(Clone)]
pub struct SaveScheduler {
    inner: Arc<Inner>,
}

impl SaveScheduler {
    /// `is_new` marks a note the store has never seen.
    pub fn new(note_id: NoteId, storage: Arc<dyn NoteStorage>, config: SaveConfig, is_new: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                note_id,
                storage,
                config,
                state: Mutex::new(SaveState {
                    is_new,
                    ..SaveState::default()
                }),
                events,
            }),
        }
    }

    pub fn note_id(&self) -> &NoteId {
        &self.inner.note_id
    }

    pub fn config(&self) -> &SaveConfig {
        &self.inner.config
    }

    /// Record `draft` as what the store already holds (after a load).
    pub fn set_baseline(&self, draft: &Draft) -> StoreResult<()> {
        let (_, fingerprint) = draft.encode()?;
        self.inner.state.lock().last_saved_snapshot = Some(fingerprint);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().dirty
    }

    pub fn is_saving(&self) -> bool {
        self.inner.state.lock().saving
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().last_saved_at
    }

    /// Receive [`SaveEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.inner.events.subscribe()
    }

    /// The note changed; `draft` is its new content.
    pub fn notify_mutation(&self, draft: Draft) {
        let mut state = self.inner.state.lock();
        state.draft = Some(draft);
        state.dirty = true;
        state.revision += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if self.inner.config.autosave {
            state.timer = self.arm_timer(state.revision);
        }
    }

    /// Cancel a pending debounced save without saving.
    pub fn cancel(&self) {
        let timer = self.inner.state.lock().timer.take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    /// Save now, skipping the debounce.
    #[tracing::instrument(skip_all, fields(note = %self.inner.note_id))]
    pub async fn flush(&self) -> StoreResult<SaveOutcome> {
        self.cancel();
        self.save_now().await
    }

    fn arm_timer(&self, revision: u64) -> Option<JoinHandle<()>> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(note = %self.inner.note_id, "no tokio runtime, autosave disabled for this mutation");
                return None;
            }
        };
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.config.debounce();

        Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            {
                let mut state = inner.state.lock();
                if state.revision != revision {
                    // superseded by a newer mutation
                    return;
                }
                state.timer = None;
            }
            let scheduler = SaveScheduler { inner };
            if let Err(err) = scheduler.save_now().await {
                tracing::debug!(error = %err, "debounced save failed");
            }
        }))
    }

    async fn save_now(&self) -> StoreResult<SaveOutcome> {
        let inner = &self.inner;
        let (record, fingerprint, revision) = {
            let mut state = inner.state.lock();
            if state.saving {
                return Ok(SaveOutcome::InFlight);
            }
            let draft = match (&state.draft, state.dirty) {
                (Some(draft), true) => draft.clone(),
                _ => return Ok(SaveOutcome::Skipped(SkipReason::Clean)),
            };
            let (record, fingerprint) = draft.encode()?;
            if state.last_saved_snapshot.as_deref() == Some(fingerprint.as_str()) {
                state.dirty = false;
                return Ok(SaveOutcome::Skipped(SkipReason::Unchanged));
            }
            if state.is_new
                && draft.title.trim().is_empty()
                && draft.digest.chars().count() < inner.config.min_content_chars
            {
                tracing::debug!(note = %inner.note_id, "new note too short to save");
                return Ok(SaveOutcome::Skipped(SkipReason::BelowMinimum));
            }
            state.saving = true;
            (record, fingerprint, state.revision)
        };

        let guard = SavingGuard::new(&inner.state);
        let result = inner.storage.save(&inner.note_id, record).await;
        guard.disarm();

        let mut state = inner.state.lock();
        state.saving = false;
        match result {
            Ok(()) => {
                let at = Utc::now();
                state.last_saved_snapshot = Some(fingerprint);
                state.last_saved_at = Some(at);
                state.is_new = false;
                if state.revision == revision {
                    state.dirty = false;
                } else if inner.config.autosave && state.timer.is_none() {
                    // a mutation landed mid-save and its timer found us busy
                    state.timer = self.arm_timer(state.revision);
                }
                drop(state);
                tracing::info!(note = %inner.note_id, "note saved");
                let _ = inner.events.send(SaveEvent::Saved {
                    note_id: inner.note_id.clone(),
                    at,
                });
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                drop(state);
                tracing::warn!(note = %inner.note_id, error = %err, "note save failed");
                let _ = inner.events.send(SaveEvent::Failed {
                    note_id: inner.note_id.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}
