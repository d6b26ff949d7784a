//! Kind-specific block payloads and the edits that can be applied to them.
//!
//! Payloads are opaque to the document model: they are moved, never
//! interpreted, by split/merge/reorder. Decoding needs the block kind, so
//! [`Payload`] has no `Deserialize` impl; use [`Payload::from_value`].
//!
//! Dates serialize as RFC 3339 strings. On load a date may also be a plain
//! `YYYY-MM-DD` or a zoneless timestamp (read as UTC), and one unreadable
//! calendar event or checklist item is dropped without losing its siblings.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::block::{Alignment, BlockKind};

/// Errors from decoding or editing a payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The kind has no payload at all.
    #[error("block kind {0} carries no payload")]
    NoPayload(BlockKind),

    /// The payload's shape does not belong to the block's kind.
    #[error("{edit} edit does not apply to a {kind} payload")]
    KindMismatch { edit: &'static str, kind: BlockKind },

    /// JSON did not match the payload shape.
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: BlockKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {index} out of range (table has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("column {index} out of range (table has {len} columns)")]
    ColumnOutOfRange { index: usize, len: usize },

    /// A table always keeps at least one row.
    #[error("cannot remove the last row")]
    LastRow,

    /// A table always keeps at least one column.
    #[error("cannot remove the last column")]
    LastColumn,

    #[error("checklist item not found: {0}")]
    ItemNotFound(String),

    #[error("calendar event not found: {0}")]
    EventNotFound(String),

    /// Checklist items need visible text.
    #[error("checklist item text is empty")]
    EmptyItemText,

    #[error("month shift out of range: {0}")]
    DateOutOfRange(i32),
}

/// Generate an id for a payload entry (checklist item, calendar event).
fn entry_id() -> String {
    uuid::Uuid::now_v7().as_simple().to_string()
}

// ── Lenient decoding ────────────────────────────────────────────────────────

/// Parse a stored date: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]` (UTC), or
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn de_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {raw:?}")))
}

fn de_date_or_now<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_date).unwrap_or_else(Utc::now))
}

fn de_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// Keep the entries that decode; skip the rest.
fn de_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(raw) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(raw
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

// ── Table ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePayload {
    pub rows: Vec<Vec<String>>,
    /// First row renders as a header row.
    pub headers: bool,
    /// Per-column alignment.
    pub alignment: Vec<Alignment>,
}

impl Default for TablePayload {
    fn default() -> Self {
        Self {
            rows: vec![vec![String::new(), String::new()], vec![String::new(), String::new()]],
            headers: false,
            alignment: vec![Alignment::Left, Alignment::Left],
        }
    }
}

impl TablePayload {
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Alignment of column `col`, left when unspecified.
    pub fn column_alignment(&self, col: usize) -> Alignment {
        self.alignment.get(col).copied().unwrap_or_default()
    }

    fn check_row(&self, index: usize) -> Result<(), PayloadError> {
        if index >= self.rows.len() {
            return Err(PayloadError::RowOutOfRange { index, len: self.rows.len() });
        }
        Ok(())
    }

    fn check_column(&self, index: usize) -> Result<(), PayloadError> {
        let len = self.column_count();
        if index >= len {
            return Err(PayloadError::ColumnOutOfRange { index, len });
        }
        Ok(())
    }
}

// ── Image ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
    Full,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePayload {
    pub src: String,
    pub alt: String,
    pub caption: String,
    pub alignment: Alignment,
    pub size: ImageSize,
}

impl Default for ImagePayload {
    fn default() -> Self {
        Self {
            src: String::new(),
            alt: String::new(),
            caption: String::new(),
            alignment: Alignment::Center,
            size: ImageSize::Medium,
        }
    }
}

// ── Calendar ────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Agenda,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Event,
    Task,
    Reminder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default = "entry_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "de_date")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: entry_id(),
            title: title.into(),
            date,
            time: None,
            description: None,
            color: None,
            event_type: Some(EventType::Event),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarPayload {
    #[serde(deserialize_with = "de_entries")]
    pub events: Vec<CalendarEvent>,
    #[serde(deserialize_with = "de_or_default")]
    pub view: CalendarView,
    /// Reference date the view is centred on.
    #[serde(rename = "currentDate", deserialize_with = "de_date_or_now")]
    pub current_date: DateTime<Utc>,
}

impl Default for CalendarPayload {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            view: CalendarView::Month,
            current_date: Utc::now(),
        }
    }
}

impl CalendarPayload {
    /// Events sorted by date, as the agenda view lists them.
    pub fn agenda(&self) -> Vec<&CalendarEvent> {
        let mut events: Vec<&CalendarEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.date);
        events
    }
}

// ── Checklist ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default = "entry_id")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "createdAt", default = "Utc::now", deserialize_with = "de_date_or_now")]
    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: entry_id(),
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistPayload {
    #[serde(deserialize_with = "de_entries")]
    pub items: Vec<ChecklistItem>,
    pub title: String,
}

impl Default for ChecklistPayload {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            title: "Checklist".to_string(),
        }
    }
}

impl ChecklistPayload {
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut ChecklistItem, PayloadError> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| PayloadError::ItemNotFound(item_id.to_string()))
    }
}

// ── Payload ─────────────────────────────────────────────────────────────────

/// Kind-specific data carried by table/image/calendar/checklist blocks.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Table(TablePayload),
    Image(ImagePayload),
    Calendar(CalendarPayload),
    Checklist(ChecklistPayload),
}

/// The payload a fresh block of `kind` starts with. `None` for kinds without one.
pub fn default_payload(kind: BlockKind) -> Option<Payload> {
    match kind {
        BlockKind::Table => Some(Payload::Table(TablePayload::default())),
        BlockKind::Image => Some(Payload::Image(ImagePayload::default())),
        BlockKind::Calendar => Some(Payload::Calendar(CalendarPayload::default())),
        BlockKind::Checklist => Some(Payload::Checklist(ChecklistPayload::default())),
        _ => None,
    }
}

impl Payload {
    /// The block kind this payload belongs to.
    pub fn kind(&self) -> BlockKind {
        match self {
            Payload::Table(_) => BlockKind::Table,
            Payload::Image(_) => BlockKind::Image,
            Payload::Calendar(_) => BlockKind::Calendar,
            Payload::Checklist(_) => BlockKind::Checklist,
        }
    }

    pub fn matches(&self, kind: BlockKind) -> bool {
        self.kind() == kind
    }

    /// Decode a payload for a block of `kind`.
    ///
    /// Missing fields take their defaults; a wrong JSON shape is an error.
    pub fn from_value(kind: BlockKind, value: Value) -> Result<Self, PayloadError> {
        let malformed = |source| PayloadError::Malformed { kind, source };
        match kind {
            BlockKind::Table => serde_json::from_value(value).map(Payload::Table).map_err(malformed),
            BlockKind::Image => serde_json::from_value(value).map(Payload::Image).map_err(malformed),
            BlockKind::Calendar => {
                serde_json::from_value(value).map(Payload::Calendar).map_err(malformed)
            }
            BlockKind::Checklist => {
                serde_json::from_value(value).map(Payload::Checklist).map_err(malformed)
            }
            other => Err(PayloadError::NoPayload(other)),
        }
    }

    /// Apply an edit in place. On error the payload is unchanged.
    pub fn apply(&mut self, edit: &PayloadEdit) -> Result<(), PayloadError> {
        let mismatch = PayloadError::KindMismatch {
            edit: edit.name(),
            kind: self.kind(),
        };
        if edit.target() != self.kind() {
            return Err(mismatch);
        }
        match self {
            Payload::Table(t) => apply_table(t, edit),
            Payload::Image(i) => apply_image(i, edit),
            Payload::Calendar(c) => apply_calendar(c, edit),
            Payload::Checklist(c) => apply_checklist(c, edit),
        }
    }
}

// ── Edits ───────────────────────────────────────────────────────────────────

/// A single edit against a block payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PayloadEdit {
    // Table
    SetCell { row: usize, col: usize, value: String },
    /// Insert an empty row after `after`, or append.
    AddRow {
        #[serde(default)]
        after: Option<usize>,
    },
    RemoveRow { index: usize },
    /// Insert an empty left-aligned column after `after`, or append.
    AddColumn {
        #[serde(default)]
        after: Option<usize>,
    },
    RemoveColumn { index: usize },
    ToggleHeaders,
    SetColumnAlignment { col: usize, alignment: Alignment },

    // Checklist
    AddItem { text: String },
    ToggleItem { item_id: String },
    RenameItem { item_id: String, text: String },
    RemoveItem { item_id: String },
    /// Check everything, or uncheck everything if all are already checked.
    ToggleAll,
    SetTitle { title: String },

    // Calendar
    AddEvent {
        title: String,
        #[serde(default)]
        date: Option<DateTime<Utc>>,
    },
    RemoveEvent { event_id: String },
    SetView { view: CalendarView },
    /// Move the reference date by whole months (negative = back).
    ShiftMonth { delta: i32 },

    // Image
    SetImage {
        #[serde(default)]
        src: Option<String>,
        #[serde(default)]
        alt: Option<String>,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        alignment: Option<Alignment>,
        #[serde(default)]
        size: Option<ImageSize>,
    },
}

impl PayloadEdit {
    /// The payload kind this edit applies to.
    pub fn target(&self) -> BlockKind {
        match self {
            PayloadEdit::SetCell { .. }
            | PayloadEdit::AddRow { .. }
            | PayloadEdit::RemoveRow { .. }
            | PayloadEdit::AddColumn { .. }
            | PayloadEdit::RemoveColumn { .. }
            | PayloadEdit::ToggleHeaders
            | PayloadEdit::SetColumnAlignment { .. } => BlockKind::Table,
            PayloadEdit::AddItem { .. }
            | PayloadEdit::ToggleItem { .. }
            | PayloadEdit::RenameItem { .. }
            | PayloadEdit::RemoveItem { .. }
            | PayloadEdit::ToggleAll
            | PayloadEdit::SetTitle { .. } => BlockKind::Checklist,
            PayloadEdit::AddEvent { .. }
            | PayloadEdit::RemoveEvent { .. }
            | PayloadEdit::SetView { .. }
            | PayloadEdit::ShiftMonth { .. } => BlockKind::Calendar,
            PayloadEdit::SetImage { .. } => BlockKind::Image,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PayloadEdit::SetCell { .. } => "set_cell",
            PayloadEdit::AddRow { .. } => "add_row",
            PayloadEdit::RemoveRow { .. } => "remove_row",
            PayloadEdit::AddColumn { .. } => "add_column",
            PayloadEdit::RemoveColumn { .. } => "remove_column",
            PayloadEdit::ToggleHeaders => "toggle_headers",
            PayloadEdit::SetColumnAlignment { .. } => "set_column_alignment",
            PayloadEdit::AddItem { .. } => "add_item",
            PayloadEdit::ToggleItem { .. } => "toggle_item",
            PayloadEdit::RenameItem { .. } => "rename_item",
            PayloadEdit::RemoveItem { .. } => "remove_item",
            PayloadEdit::ToggleAll => "toggle_all",
            PayloadEdit::SetTitle { .. } => "set_title",
            PayloadEdit::AddEvent { .. } => "add_event",
            PayloadEdit::RemoveEvent { .. } => "remove_event",
            PayloadEdit::SetView { .. } => "set_view",
            PayloadEdit::ShiftMonth { .. } => "shift_month",
            PayloadEdit::SetImage { .. } => "set_image",
        }
    }
}

fn apply_table(t: &mut TablePayload, edit: &PayloadEdit) -> Result<(), PayloadError> {
    match edit {
        PayloadEdit::SetCell { row, col, value } => {
            t.check_row(*row)?;
            let len = t.rows[*row].len();
            let cell = t.rows[*row]
                .get_mut(*col)
                .ok_or(PayloadError::ColumnOutOfRange { index: *col, len })?;
            *cell = value.clone();
        }
        PayloadEdit::AddRow { after } => {
            let width = match t.column_count() {
                0 => 2,
                n => n,
            };
            let row = vec![String::new(); width];
            match after {
                Some(i) => {
                    t.check_row(*i)?;
                    t.rows.insert(i + 1, row);
                }
                None => t.rows.push(row),
            }
        }
        PayloadEdit::RemoveRow { index } => {
            t.check_row(*index)?;
            if t.rows.len() <= 1 {
                return Err(PayloadError::LastRow);
            }
            t.rows.remove(*index);
        }
        PayloadEdit::AddColumn { after } => {
            let at = match after {
                Some(i) => {
                    t.check_column(*i)?;
                    i + 1
                }
                None => t.column_count(),
            };
            for row in &mut t.rows {
                let at = at.min(row.len());
                row.insert(at, String::new());
            }
            t.alignment.resize(at.max(t.alignment.len()), Alignment::Left);
            t.alignment.insert(at, Alignment::Left);
        }
        PayloadEdit::RemoveColumn { index } => {
            t.check_column(*index)?;
            if t.column_count() <= 1 {
                return Err(PayloadError::LastColumn);
            }
            for row in &mut t.rows {
                if *index < row.len() {
                    row.remove(*index);
                }
            }
            if *index < t.alignment.len() {
                t.alignment.remove(*index);
            }
        }
        PayloadEdit::ToggleHeaders => t.headers = !t.headers,
        PayloadEdit::SetColumnAlignment { col, alignment } => {
            t.check_column(*col)?;
            if t.alignment.len() <= *col {
                t.alignment.resize(col + 1, Alignment::Left);
            }
            t.alignment[*col] = *alignment;
        }
        other => {
            return Err(PayloadError::KindMismatch {
                edit: other.name(),
                kind: BlockKind::Table,
            });
        }
    }
    Ok(())
}

fn apply_checklist(c: &mut ChecklistPayload, edit: &PayloadEdit) -> Result<(), PayloadError> {
    match edit {
        PayloadEdit::AddItem { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(PayloadError::EmptyItemText);
            }
            c.items.push(ChecklistItem::new(text));
        }
        PayloadEdit::ToggleItem { item_id } => {
            let item = c.item_mut(item_id)?;
            item.completed = !item.completed;
        }
        PayloadEdit::RenameItem { item_id, text } => {
            c.item_mut(item_id)?.text = text.clone();
        }
        PayloadEdit::RemoveItem { item_id } => {
            let before = c.items.len();
            c.items.retain(|i| &i.id != item_id);
            if c.items.len() == before {
                return Err(PayloadError::ItemNotFound(item_id.clone()));
            }
        }
        PayloadEdit::ToggleAll => {
            let all_done = !c.items.is_empty() && c.items.iter().all(|i| i.completed);
            for item in &mut c.items {
                item.completed = !all_done;
            }
        }
        PayloadEdit::SetTitle { title } => c.title = title.clone(),
        other => {
            return Err(PayloadError::KindMismatch {
                edit: other.name(),
                kind: BlockKind::Checklist,
            });
        }
    }
    Ok(())
}

fn apply_calendar(c: &mut CalendarPayload, edit: &PayloadEdit) -> Result<(), PayloadError> {
    match edit {
        PayloadEdit::AddEvent { title, date } => {
            let mut event = CalendarEvent::new(title.clone(), date.unwrap_or_else(Utc::now));
            event.color = Some("#3b82f6".to_string());
            c.events.push(event);
        }
        PayloadEdit::RemoveEvent { event_id } => {
            let before = c.events.len();
            c.events.retain(|e| &e.id != event_id);
            if c.events.len() == before {
                return Err(PayloadError::EventNotFound(event_id.clone()));
            }
        }
        PayloadEdit::SetView { view } => c.view = *view,
        PayloadEdit::ShiftMonth { delta } => {
            let months = Months::new(delta.unsigned_abs());
            let shifted = if *delta >= 0 {
                c.current_date.checked_add_months(months)
            } else {
                c.current_date.checked_sub_months(months)
            };
            c.current_date = shifted.ok_or(PayloadError::DateOutOfRange(*delta))?;
        }
        other => {
            return Err(PayloadError::KindMismatch {
                edit: other.name(),
                kind: BlockKind::Calendar,
            });
        }
    }
    Ok(())
}

fn apply_image(i: &mut ImagePayload, edit: &PayloadEdit) -> Result<(), PayloadError> {
    match edit {
        PayloadEdit::SetImage { src, alt, caption, alignment, size } => {
            if let Some(src) = src {
                i.src = src.trim().to_string();
            }
            if let Some(alt) = alt {
                i.alt = alt.clone();
            }
            if let Some(caption) = caption {
                i.caption = caption.clone();
            }
            if let Some(alignment) = alignment {
                i.alignment = *alignment;
            }
            if let Some(size) = size {
                i.size = *size;
            }
        }
        other => {
            return Err(PayloadError::KindMismatch {
                edit: other.name(),
                kind: BlockKind::Image,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Payload {
        default_payload(BlockKind::Table).unwrap()
    }

    fn as_table(p: &Payload) -> &TablePayload {
        match p {
            Payload::Table(t) => t,
            other => panic!("expected table, got {:?}", other.kind()),
        }
    }

    fn as_checklist(p: &Payload) -> &ChecklistPayload {
        match p {
            Payload::Checklist(c) => c,
            other => panic!("expected checklist, got {:?}", other.kind()),
        }
    }

    // ── Defaults ────────────────────────────────────────────────────────

    #[test]
    fn test_default_payloads() {
        let t = table();
        assert_eq!(as_table(&t).rows, vec![vec!["", ""], vec!["", ""]]);
        assert!(!as_table(&t).headers);
        assert_eq!(as_table(&t).alignment, vec![Alignment::Left, Alignment::Left]);

        match default_payload(BlockKind::Image) {
            Some(Payload::Image(i)) => {
                assert_eq!(i.alignment, Alignment::Center);
                assert_eq!(i.size, ImageSize::Medium);
                assert!(i.src.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        match default_payload(BlockKind::Checklist) {
            Some(Payload::Checklist(c)) => {
                assert!(c.items.is_empty());
                assert_eq!(c.title, "Checklist");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(default_payload(BlockKind::Calendar), Some(Payload::Calendar(_))));
        assert!(default_payload(BlockKind::Paragraph).is_none());
        assert!(default_payload(BlockKind::Divider).is_none());
    }

    // ── Decoding ────────────────────────────────────────────────────────

    #[test]
    fn test_from_value_fills_missing_fields() {
        let p = Payload::from_value(BlockKind::Table, json!({"rows": [["a"]]})).unwrap();
        assert_eq!(as_table(&p).rows, vec![vec!["a"]]);
        assert!(!as_table(&p).headers);
    }

    #[test]
    fn test_from_value_rejects_wrong_shape() {
        let err = Payload::from_value(BlockKind::Table, json!({"rows": "nope"})).unwrap_err();
        assert!(matches!(err, PayloadError::Malformed { kind: BlockKind::Table, .. }));
        let err = Payload::from_value(BlockKind::Quote, json!({})).unwrap_err();
        assert!(matches!(err, PayloadError::NoPayload(BlockKind::Quote)));
    }

    #[test]
    fn test_calendar_dates_roundtrip_as_rfc3339() {
        let json = json!({
            "events": [{
                "id": "1700000000000",
                "title": "Standup",
                "date": "2024-03-05T09:30:00.000Z",
                "color": "#3b82f6",
                "type": "task"
            }],
            "view": "agenda",
            "currentDate": "2024-03-01T00:00:00Z"
        });
        let p = Payload::from_value(BlockKind::Calendar, json).unwrap();
        let Payload::Calendar(c) = &p else { panic!("not a calendar") };
        assert_eq!(c.view, CalendarView::Agenda);
        assert_eq!(c.events[0].event_type, Some(EventType::Task));
        assert_eq!(c.events[0].date.to_rfc3339(), "2024-03-05T09:30:00+00:00");

        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["events"][0]["date"], "2024-03-05T09:30:00Z");
        assert_eq!(back["currentDate"], "2024-03-01T00:00:00Z");
        assert!(back["events"][0].get("time").is_none());
        let again = Payload::from_value(BlockKind::Calendar, back).unwrap();
        assert_eq!(again, p);
    }

    #[test]
    fn test_checklist_wire_names() {
        let p = Payload::from_value(
            BlockKind::Checklist,
            json!({"title": "Groceries", "items": [{"id": "a", "text": "milk", "completed": true, "createdAt": "2024-01-01T00:00:00Z"}]}),
        )
        .unwrap();
        let c = as_checklist(&p);
        assert_eq!(c.completed_count(), 1);
        let back = serde_json::to_value(&p).unwrap();
        assert_eq!(back["items"][0]["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_date_forms() {
        let midnight = "2025-03-15T00:00:00Z";
        assert_eq!(parse_date("2025-03-15").unwrap().to_rfc3339(), "2025-03-15T00:00:00+00:00");
        assert_eq!(parse_date(midnight), parse_date("2025-03-15"));
        assert_eq!(
            parse_date("2025-03-15T08:30:00").unwrap().to_rfc3339(),
            "2025-03-15T08:30:00+00:00"
        );
        assert_eq!(
            parse_date("2025-03-15T08:30:00+02:00").unwrap().to_rfc3339(),
            "2025-03-15T06:30:00+00:00"
        );
        assert!(parse_date("next tuesday").is_none());
    }

    #[test]
    fn test_bad_entries_do_not_wipe_siblings() {
        let p = Payload::from_value(
            BlockKind::Calendar,
            json!({
                "view": "week",
                "currentDate": "2025-03-01T00:00:00Z",
                "events": [
                    {"id": "a", "title": "Standup", "date": "2025-03-14T09:00:00Z"},
                    {"id": "b", "title": "Dentist", "date": "2025-03-15"},
                    {"id": "c", "title": "Broken", "date": "someday"},
                    {"id": "d", "title": "Missing date"},
                ]
            }),
        )
        .unwrap();
        let Payload::Calendar(c) = &p else { panic!("not a calendar") };
        assert_eq!(c.view, CalendarView::Week);
        assert_eq!(c.current_date.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        let ids: Vec<&str> = c.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(c.events[1].date.to_rfc3339(), "2025-03-15T00:00:00+00:00");

        let p = Payload::from_value(
            BlockKind::Checklist,
            json!({
                "title": "Groceries",
                "items": [
                    {"id": "x", "text": "milk", "createdAt": "2025-03-14"},
                    {"id": "y", "text": "eggs", "createdAt": "garbage"},
                    "not an item",
                ]
            }),
        )
        .unwrap();
        let c = as_checklist(&p);
        assert_eq!(c.title, "Groceries");
        assert_eq!(c.items.len(), 2);
        assert_eq!(c.items[0].created_at.to_rfc3339(), "2025-03-14T00:00:00+00:00");
        assert_eq!(c.items[1].text, "eggs");
    }

    // ── Table edits ─────────────────────────────────────────────────────

    #[test]
    fn test_table_rows_and_columns() {
        let mut p = table();
        p.apply(&PayloadEdit::SetCell { row: 0, col: 1, value: "x".into() }).unwrap();
        p.apply(&PayloadEdit::AddRow { after: Some(0) }).unwrap();
        p.apply(&PayloadEdit::AddColumn { after: None }).unwrap();
        let t = as_table(&p);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0], vec!["", "x", ""]);
        assert_eq!(t.rows[1], vec!["", "", ""]);
        assert_eq!(t.alignment.len(), 3);

        p.apply(&PayloadEdit::RemoveColumn { index: 0 }).unwrap();
        assert_eq!(as_table(&p).rows[0], vec!["x", ""]);
        assert_eq!(as_table(&p).alignment.len(), 2);
    }

    #[test]
    fn test_table_keeps_one_row_and_column() {
        let mut p = Payload::from_value(BlockKind::Table, json!({"rows": [["only"]], "alignment": ["left"]})).unwrap();
        assert!(matches!(p.apply(&PayloadEdit::RemoveRow { index: 0 }), Err(PayloadError::LastRow)));
        assert!(matches!(p.apply(&PayloadEdit::RemoveColumn { index: 0 }), Err(PayloadError::LastColumn)));
        assert_eq!(as_table(&p).rows, vec![vec!["only"]]);
    }

    #[test]
    fn test_table_out_of_range() {
        let mut p = table();
        let err = p.apply(&PayloadEdit::SetCell { row: 5, col: 0, value: "x".into() }).unwrap_err();
        assert!(matches!(err, PayloadError::RowOutOfRange { index: 5, len: 2 }));
        let err = p.apply(&PayloadEdit::SetColumnAlignment { col: 2, alignment: Alignment::Right }).unwrap_err();
        assert!(matches!(err, PayloadError::ColumnOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_table_headers_and_alignment() {
        let mut p = table();
        p.apply(&PayloadEdit::ToggleHeaders).unwrap();
        p.apply(&PayloadEdit::SetColumnAlignment { col: 1, alignment: Alignment::Right }).unwrap();
        let t = as_table(&p);
        assert!(t.headers);
        assert_eq!(t.column_alignment(1), Alignment::Right);
        assert_eq!(t.column_alignment(7), Alignment::Left);
    }

    // ── Checklist edits ─────────────────────────────────────────────────

    #[test]
    fn test_checklist_items() {
        let mut p = default_payload(BlockKind::Checklist).unwrap();
        p.apply(&PayloadEdit::AddItem { text: "  milk ".into() }).unwrap();
        p.apply(&PayloadEdit::AddItem { text: "eggs".into() }).unwrap();
        assert!(matches!(p.apply(&PayloadEdit::AddItem { text: "   ".into() }), Err(PayloadError::EmptyItemText)));

        let first = as_checklist(&p).items[0].id.clone();
        assert_eq!(as_checklist(&p).items[0].text, "milk");
        p.apply(&PayloadEdit::ToggleItem { item_id: first.clone() }).unwrap();
        assert_eq!(as_checklist(&p).completed_count(), 1);

        p.apply(&PayloadEdit::ToggleAll).unwrap();
        assert_eq!(as_checklist(&p).completed_count(), 2);
        p.apply(&PayloadEdit::ToggleAll).unwrap();
        assert_eq!(as_checklist(&p).completed_count(), 0);

        p.apply(&PayloadEdit::RenameItem { item_id: first.clone(), text: "oat milk".into() }).unwrap();
        p.apply(&PayloadEdit::RemoveItem { item_id: first.clone() }).unwrap();
        assert_eq!(as_checklist(&p).items.len(), 1);
        assert!(matches!(
            p.apply(&PayloadEdit::RemoveItem { item_id: first }),
            Err(PayloadError::ItemNotFound(_))
        ));

        p.apply(&PayloadEdit::SetTitle { title: "Shopping".into() }).unwrap();
        assert_eq!(as_checklist(&p).title, "Shopping");
    }

    // ── Calendar edits ──────────────────────────────────────────────────

    #[test]
    fn test_calendar_events_and_months() {
        let mut p = Payload::from_value(BlockKind::Calendar, json!({"currentDate": "2024-01-31T00:00:00Z"})).unwrap();
        p.apply(&PayloadEdit::AddEvent { title: "Launch".into(), date: None }).unwrap();
        p.apply(&PayloadEdit::ShiftMonth { delta: 1 }).unwrap();
        p.apply(&PayloadEdit::SetView { view: CalendarView::Week }).unwrap();
        let Payload::Calendar(c) = &p else { panic!("not a calendar") };
        assert_eq!(c.events.len(), 1);
        assert_eq!(c.events[0].event_type, Some(EventType::Event));
        assert_eq!(c.current_date.to_rfc3339(), "2024-02-29T00:00:00+00:00");
        assert_eq!(c.view, CalendarView::Week);

        let id = c.events[0].id.clone();
        p.apply(&PayloadEdit::ShiftMonth { delta: -2 }).unwrap();
        p.apply(&PayloadEdit::RemoveEvent { event_id: id }).unwrap();
        let Payload::Calendar(c) = &p else { panic!("not a calendar") };
        assert!(c.events.is_empty());
        assert_eq!(c.current_date.to_rfc3339(), "2023-12-29T00:00:00+00:00");
    }

    // ── Image edits / mismatch ──────────────────────────────────────────

    #[test]
    fn test_image_partial_update() {
        let mut p = default_payload(BlockKind::Image).unwrap();
        p.apply(&PayloadEdit::SetImage {
            src: Some(" https://example.com/cat.png ".into()),
            alt: None,
            caption: Some("A cat".into()),
            alignment: None,
            size: Some(ImageSize::Full),
        })
        .unwrap();
        let Payload::Image(i) = &p else { panic!("not an image") };
        assert_eq!(i.src, "https://example.com/cat.png");
        assert_eq!(i.caption, "A cat");
        assert_eq!(i.alignment, Alignment::Center);
        assert_eq!(i.size, ImageSize::Full);
    }

    #[test]
    fn test_edit_kind_mismatch_leaves_payload() {
        let mut p = table();
        let before = p.clone();
        let err = p.apply(&PayloadEdit::ToggleAll).unwrap_err();
        assert!(matches!(err, PayloadError::KindMismatch { edit: "toggle_all", kind: BlockKind::Table }));
        assert_eq!(p, before);
    }

    #[test]
    fn test_payload_edit_wire_shape() {
        let edit: PayloadEdit = serde_json::from_value(json!({"op": "set_cell", "row": 1, "col": 0, "value": "hi"})).unwrap();
        assert_eq!(edit, PayloadEdit::SetCell { row: 1, col: 0, value: "hi".into() });
        let edit: PayloadEdit = serde_json::from_value(json!({"op": "add_row"})).unwrap();
        assert_eq!(edit, PayloadEdit::AddRow { after: None });
        assert_eq!(edit.target(), BlockKind::Table);
    }
}
