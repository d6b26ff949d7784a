//! Block array exchanged with the note storage service.
//!
//! Saving is strict: [`serialize_blocks`] emits `{id, kind, text, formats,
//! alignment, payload}` objects with payload dates as RFC 3339 strings.
//!
//! Loading is lenient. Notes written by older clients (or edited by hand)
//! arrive with missing fields, legacy field names (`type`, `content`,
//! `data`), unknown kinds and out-of-range spans. [`load_blocks`] repairs
//! what it can and never fails:
//!
//! | Input                      | Repair                                   |
//! |----------------------------|------------------------------------------|
//! | missing / bad / duplicate id | fresh id                               |
//! | unknown kind               | paragraph                                |
//! | bad span                   | dropped                                  |
//! | bad payload                | kind's default payload                   |
//! | non-object element         | dropped                                  |
//! | absent / non-array `blocks`| single paragraph seeded from `text`      |

use std::collections::HashSet;

use folio_types::{Alignment, Block, BlockId, BlockKind, FormatSpan, Payload, default_payload};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from strict block encoding and decoding.
#[derive(Error, Debug)]
pub enum WireError {
    /// A block could not be encoded.
    #[error("failed to encode blocks: {0}")]
    Encode(#[from] serde_json::Error),

    /// `blocks` was present but not a JSON array.
    #[error("blocks must be a JSON array, got {0}")]
    NotAnArray(&'static str),
}

/// Encode blocks for the storage service.
pub fn serialize_blocks(blocks: &[Block]) -> Result<Value, WireError> {
    Ok(serde_json::to_value(blocks)?)
}

/// Decode a block array, repairing individual blocks.
///
/// Fails only when `value` is not an array.
pub fn decode_blocks(value: &Value) -> Result<Vec<Block>, WireError> {
    let Value::Array(items) = value else {
        return Err(WireError::NotAnArray(json_type(value)));
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut blocks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            tracing::debug!(index, found = json_type(item), "dropping non-object block");
            continue;
        };
        let mut block = decode_block(index, fields);
        if !seen.insert(block.id) {
            let fresh = BlockId::new();
            tracing::debug!(index, duplicate = %block.id, fresh = %fresh, "duplicate block id");
            block.id = fresh;
            seen.insert(fresh);
        }
        blocks.push(block);
    }
    Ok(blocks)
}

/// Load the blocks of a stored note.
///
/// Absent, malformed or empty `blocks` degrade to a single paragraph
/// holding `fallback_text`.
pub fn load_blocks(blocks: Option<&Value>, fallback_text: &str) -> Vec<Block> {
    let decoded = match blocks {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => decode_blocks(value).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "stored blocks unreadable, falling back to plain text");
            Vec::new()
        }),
    };
    if decoded.is_empty() {
        return vec![Block::paragraph(fallback_text)];
    }
    decoded
}

fn decode_block(index: usize, fields: &Map<String, Value>) -> Block {
    let id = match field(fields, &["id"]).and_then(Value::as_str).map(BlockId::parse) {
        Some(Ok(id)) if !id.is_nil() => id,
        Some(Err(err)) => {
            tracing::debug!(index, error = %err, "bad block id, assigning a fresh one");
            BlockId::new()
        }
        _ => BlockId::new(),
    };

    let kind = match field(fields, &["kind", "type"]).and_then(Value::as_str) {
        Some(name) => BlockKind::from_str(name).unwrap_or_else(|| {
            tracing::debug!(index, block = %id, kind = name, "unknown block kind, using paragraph");
            BlockKind::Paragraph
        }),
        None => BlockKind::Paragraph,
    };

    let text = field(fields, &["text", "content"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let formats = match field(fields, &["formats"]) {
        Some(Value::Array(spans)) => spans
            .iter()
            .filter_map(|span| match serde_json::from_value::<FormatSpan>(span.clone()) {
                Ok(span) => Some(span),
                Err(err) => {
                    tracing::debug!(index, block = %id, error = %err, "dropping malformed span");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    let alignment = field(fields, &["alignment"])
        .and_then(Value::as_str)
        .and_then(Alignment::from_str)
        .unwrap_or_default();

    let payload = if kind.has_payload() {
        decode_payload(index, &id, kind, field(fields, &["payload", "data"]))
    } else {
        None
    };

    let mut block = Block {
        id,
        kind,
        text,
        formats,
        alignment,
        payload,
    };
    if block.sanitize() {
        tracing::debug!(index, block = %block.id, kind = %block.kind, "repaired block contents");
    }
    block
}

fn decode_payload(index: usize, id: &BlockId, kind: BlockKind, value: Option<&Value>) -> Option<Payload> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return default_payload(kind);
    };
    match Payload::from_value(kind, value.clone()) {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::debug!(index, block = %id, error = %err, "bad payload, using default");
            default_payload(kind)
        }
    }
}

/// First present, non-null field among `names`.
fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|v| !v.is_null())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{
        CalendarEvent, CalendarPayload, CalendarView, ChecklistItem, ChecklistPayload, FormatKind, ImagePayload,
        ImageSize, TablePayload,
    };
    use serde_json::json;

    fn round_trip(blocks: &[Block]) -> Vec<Block> {
        let value = serialize_blocks(blocks).unwrap();
        // through a string, as the stores do
        let text = serde_json::to_string(&value).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        decode_blocks(&parsed).unwrap()
    }

    #[test]
    fn test_round_trip_every_kind() {
        let blocks: Vec<Block> = BlockKind::ALL
            .iter()
            .map(|kind| Block::new(*kind).with_text("some text"))
            .collect();
        assert_eq!(round_trip(&blocks), blocks);
    }

    #[test]
    fn test_round_trip_text_and_spans() {
        let block = Block::paragraph("hello world")
            .with_formats(vec![
                FormatSpan::new(0, 5, FormatKind::Bold),
                FormatSpan::new(6, 11, FormatKind::Italic),
            ])
            .with_alignment(Alignment::Right);
        assert_eq!(round_trip(std::slice::from_ref(&block)), vec![block]);
    }

    #[test]
    fn test_round_trip_payloads_with_dates() {
        let date = "2025-03-14T09:30:00Z".parse().unwrap();
        let calendar = CalendarPayload {
            events: vec![CalendarEvent::new("standup", date)],
            current_date: date,
            ..CalendarPayload::default()
        };
        let checklist = ChecklistPayload {
            items: vec![ChecklistItem::new("milk")],
            title: "Groceries".into(),
        };
        let table = TablePayload {
            rows: vec![vec!["a".into(), "b".into(), "c".into()]],
            headers: true,
            alignment: vec![Alignment::Left, Alignment::Center, Alignment::Right],
        };
        let image = ImagePayload {
            src: "https://example.com/cat.png".into(),
            size: ImageSize::Full,
            ..ImagePayload::default()
        };
        let blocks = vec![
            Block::new(BlockKind::Calendar).with_payload(Payload::Calendar(calendar)),
            Block::new(BlockKind::Checklist).with_payload(Payload::Checklist(checklist)),
            Block::new(BlockKind::Table).with_payload(Payload::Table(table)),
            Block::new(BlockKind::Image).with_payload(Payload::Image(image)),
        ];

        let value = serialize_blocks(&blocks).unwrap();
        assert_eq!(value[0]["payload"]["currentDate"], "2025-03-14T09:30:00Z");
        assert_eq!(value[0]["payload"]["events"][0]["date"], "2025-03-14T09:30:00Z");
        assert_eq!(round_trip(&blocks), blocks);
    }

    #[test]
    fn test_serialized_shape() {
        let block = Block::new(BlockKind::Checklist);
        let value = serialize_blocks(std::slice::from_ref(&block)).unwrap();
        assert_eq!(value[0]["kind"], "todoList");
        assert_eq!(value[0]["alignment"], "left");
        assert_eq!(value[0]["payload"]["title"], "Checklist");

        let para = serialize_blocks(&[Block::paragraph("x")]).unwrap();
        assert!(para[0].get("payload").is_none());
    }

    #[test]
    fn test_legacy_field_names() {
        let value = json!([
            {"id": "not-a-uuid", "type": "heading1", "content": "Title"},
            {"type": "checklist", "data": {"items": [{"text": "a", "completed": true}]}},
        ]);
        let blocks = decode_blocks(&value).unwrap();
        assert_eq!(blocks[0].kind, BlockKind::Heading1);
        assert_eq!(blocks[0].text, "Title");
        assert!(!blocks[0].id.is_nil());
        let Some(Payload::Checklist(list)) = &blocks[1].payload else {
            panic!("expected checklist payload");
        };
        assert_eq!(list.items.len(), 1);
        assert!(list.items[0].completed);
        assert_eq!(list.title, "Checklist");
    }

    #[test]
    fn test_repairs_malformed_blocks() {
        let dup = BlockId::new().to_string();
        let value = json!([
            {"id": dup, "kind": "video", "text": "clip"},
            {"id": dup, "kind": "paragraph", "text": "abc",
             "formats": [{"start": 0, "end": 2, "type": "bold"},
                         {"start": 1, "end": 9, "type": "bold"},
                         {"start": 0, "end": 1, "type": "strike"},
                         "junk"]},
            42,
            {"kind": "table", "payload": {"rows": "nope"}},
            {"kind": "divider", "text": "ignored", "alignment": "sideways"},
        ]);
        let blocks = decode_blocks(&value).unwrap();
        assert_eq!(blocks.len(), 4);

        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].text, "clip");
        assert_ne!(blocks[0].id, blocks[1].id);

        assert_eq!(blocks[1].formats, vec![FormatSpan::new(0, 2, FormatKind::Bold)]);

        assert_eq!(blocks[2].payload, default_payload(BlockKind::Table));

        assert_eq!(blocks[3].kind, BlockKind::Divider);
        assert!(blocks[3].text.is_empty());
        assert_eq!(blocks[3].alignment, Alignment::Left);
    }

    #[test]
    fn test_one_bad_payload_entry_keeps_the_rest() {
        let value = json!([
            {"kind": "calendar", "payload": {
                "view": "week",
                "events": [
                    {"id": "ok", "title": "Review", "date": "2025-03-14T10:00:00.000Z"},
                    {"id": "day", "title": "Holiday", "date": "2025-03-15"},
                    {"id": "bad", "title": "Lost", "date": "not a date"},
                ]}},
            {"kind": "todoList", "payload": {
                "title": "Groceries",
                "items": [{"text": "milk", "createdAt": "2025-03-14"}, {"text": 7}]}},
        ]);
        let blocks = decode_blocks(&value).unwrap();

        let Some(Payload::Calendar(calendar)) = &blocks[0].payload else {
            panic!("expected calendar payload");
        };
        assert_eq!(calendar.view, CalendarView::Week);
        let titles: Vec<&str> = calendar.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Review", "Holiday"]);

        let Some(Payload::Checklist(list)) = &blocks[1].payload else {
            panic!("expected checklist payload");
        };
        assert_eq!(list.title, "Groceries");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].text, "milk");

        // what survives loads back unchanged
        assert_eq!(round_trip(&blocks), blocks);
    }

    #[test]
    fn test_load_falls_back_to_text() {
        let blocks = load_blocks(None, "plain body");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].text, "plain body");

        let blocks = load_blocks(Some(&json!({"not": "an array"})), "fallback");
        assert_eq!(blocks[0].text, "fallback");

        let blocks = load_blocks(Some(&json!([])), "");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode_blocks(&json!("blocks")).unwrap_err();
        assert!(matches!(err, WireError::NotAnArray("string")));
    }
}
