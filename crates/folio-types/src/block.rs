//! Block types: kinds, alignment, inline format spans, and the block itself.
//!
//! A note is an ordered list of [`Block`]s. Text-bearing kinds carry `text`
//! plus [`FormatSpan`]s; payload kinds (table, image, calendar, checklist)
//! carry a [`Payload`] instead. Divider carries neither.
//!
//! All offsets are char offsets into `text`, never byte offsets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::BlockId;
use crate::payload::{Payload, default_payload};

// ── BlockKind ───────────────────────────────────────────────────────────────

/// The closed set of block kinds.
///
/// Serialized with the storage service's historical names (`bulletList`,
/// `todoList`, ...). Parsing is case-insensitive and accepts a few aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BlockKind {
    #[default]
    #[serde(rename = "paragraph")]
    #[strum(serialize = "paragraph", serialize = "p", serialize = "text")]
    Paragraph,
    #[serde(rename = "heading1")]
    #[strum(serialize = "heading1", serialize = "h1")]
    Heading1,
    #[serde(rename = "heading2")]
    #[strum(serialize = "heading2", serialize = "h2")]
    Heading2,
    #[serde(rename = "heading3")]
    #[strum(serialize = "heading3", serialize = "h3")]
    Heading3,
    #[serde(rename = "bulletList")]
    #[strum(serialize = "bulletList", serialize = "bullet", serialize = "bulleted_item")]
    BulletedItem,
    #[serde(rename = "numberedList")]
    #[strum(serialize = "numberedList", serialize = "numbered", serialize = "numbered_item")]
    NumberedItem,
    #[serde(rename = "quote")]
    #[strum(serialize = "quote")]
    Quote,
    #[serde(rename = "code")]
    #[strum(serialize = "code")]
    Code,
    #[serde(rename = "divider")]
    #[strum(serialize = "divider", serialize = "hr")]
    Divider,
    #[serde(rename = "table")]
    #[strum(serialize = "table")]
    Table,
    #[serde(rename = "image")]
    #[strum(serialize = "image")]
    Image,
    #[serde(rename = "calendar")]
    #[strum(serialize = "calendar")]
    Calendar,
    #[serde(rename = "todoList", alias = "checklist")]
    #[strum(serialize = "todoList", serialize = "checklist", serialize = "todo")]
    Checklist,
}

impl BlockKind {
    /// Every kind, in toolbar order.
    pub const ALL: [BlockKind; 13] = [
        BlockKind::Paragraph,
        BlockKind::Heading1,
        BlockKind::Heading2,
        BlockKind::Heading3,
        BlockKind::BulletedItem,
        BlockKind::NumberedItem,
        BlockKind::Quote,
        BlockKind::Code,
        BlockKind::Divider,
        BlockKind::Table,
        BlockKind::Image,
        BlockKind::Calendar,
        BlockKind::Checklist,
    ];

    /// Parse from string (case-insensitive, aliases accepted).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading1 => "heading1",
            BlockKind::Heading2 => "heading2",
            BlockKind::Heading3 => "heading3",
            BlockKind::BulletedItem => "bulletList",
            BlockKind::NumberedItem => "numberedList",
            BlockKind::Quote => "quote",
            BlockKind::Code => "code",
            BlockKind::Divider => "divider",
            BlockKind::Table => "table",
            BlockKind::Image => "image",
            BlockKind::Calendar => "calendar",
            BlockKind::Checklist => "todoList",
        }
    }

    /// Kinds whose content is editable text with format spans.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::Heading1
                | BlockKind::Heading2
                | BlockKind::Heading3
                | BlockKind::BulletedItem
                | BlockKind::NumberedItem
                | BlockKind::Quote
                | BlockKind::Code
        )
    }

    /// Bulleted or numbered list item.
    pub fn is_list(&self) -> bool {
        matches!(self, BlockKind::BulletedItem | BlockKind::NumberedItem)
    }

    /// Kinds whose content lives in a [`Payload`].
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            BlockKind::Table | BlockKind::Image | BlockKind::Calendar | BlockKind::Checklist
        )
    }

    /// 1..=3 for headings.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockKind::Heading1 => Some(1),
            BlockKind::Heading2 => Some(2),
            BlockKind::Heading3 => Some(3),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Alignment ───────────────────────────────────────────────────────────────

/// Horizontal alignment of a block, image, or table column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    pub fn is_left(&self) -> bool {
        matches!(self, Alignment::Left)
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── FormatKind / FormatSpan ─────────────────────────────────────────────────

/// Inline format kind.
///
/// The derived `Ord` is the nesting order used by rendering:
/// bold wraps italic wraps underline wraps code.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FormatKind {
    Bold,
    Italic,
    Underline,
    Code,
}

impl FormatKind {
    pub const ALL: [FormatKind; 4] = [
        FormatKind::Bold,
        FormatKind::Italic,
        FormatKind::Underline,
        FormatKind::Code,
    ];

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Bold => "bold",
            FormatKind::Italic => "italic",
            FormatKind::Underline => "underline",
            FormatKind::Code => "code",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-open `[start, end)` char interval tagged with a format kind.
///
/// Field order gives the derived `Ord` its (start, end, kind) sort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormatSpan {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type", alias = "kind")]
    pub kind: FormatKind,
}

impl FormatSpan {
    pub fn new(start: usize, end: usize, kind: FormatKind) -> Self {
        Self { start, end, kind }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Valid inside a text of `text_len` chars.
    pub fn fits(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }

    /// Char at `pos` is formatted by this span.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// The whole of `[start, end)` is formatted by this span.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

// ── Block ───────────────────────────────────────────────────────────────────

/// One block of a note.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub text: String,
    pub formats: Vec<FormatSpan>,
    pub alignment: Alignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Block {
    /// A fresh block of `kind` with empty text and the kind's default payload.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            text: String::new(),
            formats: Vec::new(),
            alignment: Alignment::Left,
            payload: default_payload(kind),
        }
    }

    /// A fresh paragraph holding `text`.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph).with_text(text)
    }

    /// Builder-style text setter. Ignored for non-text kinds.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        if self.kind.is_text() {
            self.text = text.into();
        }
        self
    }

    /// Builder-style span setter. Ignored for non-text kinds.
    pub fn with_formats(mut self, formats: Vec<FormatSpan>) -> Self {
        if self.kind.is_text() {
            self.formats = formats;
        }
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        if payload.matches(self.kind) {
            self.payload = Some(payload);
        }
        self
    }

    /// Text length in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// A list item holding nothing but whitespace. Enter and Backspace on it
    /// leave the list (retype to paragraph) instead of splitting or merging.
    pub fn is_empty_list_item(&self) -> bool {
        self.kind.is_list() && self.is_blank()
    }

    /// Enforce the per-kind invariants in place. Returns true if anything changed.
    ///
    /// - text-bearing: no payload; spans sorted, deduplicated, inside the text
    /// - payload kinds: no text, no spans, payload present and of the right shape
    /// - divider: nothing but id/alignment
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();

        if self.kind.is_text() {
            self.payload = None;
            let len = self.char_len();
            self.formats.retain(|s| s.fits(len));
            self.formats.sort();
            self.formats.dedup();
        } else {
            self.text.clear();
            self.formats.clear();
            let ok = match &self.payload {
                Some(p) => p.matches(self.kind),
                None => !self.kind.has_payload(),
            };
            if !ok {
                self.payload = default_payload(self.kind);
            }
        }

        *self != before
    }
}

// ============================================================================
// Tests
// ============================================================================
