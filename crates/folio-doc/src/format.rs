//! Format span engine.
//!
//! Spans are half-open `[start, end)` char intervals over a block's text.
//! Every text edit runs [`adjust_for_edit`] so spans keep covering the same
//! characters; [`render`] sweeps span boundaries into display segments.
//!
//! # Edit rules
//!
//! An edit replaces `[edit_start, edit_end)` with `inserted` chars. It is
//! applied as a deletion followed by an insertion at `edit_start`:
//!
//! - deletion: positions before the range stay, positions after it move left
//!   by the deleted length, positions inside collapse to `edit_start`
//! - insertion: a span strictly containing the point grows; a span starting
//!   at the point moves right (new text is not formatted); a span ending at
//!   the point does not grow
//!
//! Spans that end up empty or past the end of the new text are dropped.

use folio_types::{FormatKind, FormatSpan};
use serde::Serialize;

use crate::text;

/// Toggle `kind` over `[start, end)`.
///
/// Returns `Some(true)` if the span was added, `Some(false)` if an identical
/// span was removed, `None` for an empty selection (no change).
pub fn toggle_format(
    spans: &mut Vec<FormatSpan>,
    kind: FormatKind,
    start: usize,
    end: usize,
) -> Option<bool> {
    if start >= end {
        return None;
    }
    let span = FormatSpan::new(start, end, kind);
    if let Some(pos) = spans.iter().position(|s| *s == span) {
        spans.remove(pos);
        return Some(false);
    }
    spans.push(span);
    normalize(spans);
    Some(true)
}

/// Rewrite spans for an edit replacing `[edit_start, edit_end)` with
/// `inserted_len` chars. `new_len` is the text length after the edit.
pub fn adjust_for_edit(
    spans: &[FormatSpan],
    edit_start: usize,
    edit_end: usize,
    inserted_len: usize,
    new_len: usize,
) -> Vec<FormatSpan> {
    let edit_end = edit_end.max(edit_start);
    let deleted = edit_end - edit_start;

    let after_delete = |p: usize| {
        if p <= edit_start {
            p
        } else if p >= edit_end {
            p - deleted
        } else {
            edit_start
        }
    };

    let mut out: Vec<FormatSpan> = spans
        .iter()
        .map(|s| {
            let mut start = after_delete(s.start);
            let mut end = after_delete(s.end);
            if start >= edit_start {
                start += inserted_len;
            }
            if end > edit_start {
                end += inserted_len;
            }
            FormatSpan::new(start, end, s.kind)
        })
        .filter(|s| s.fits(new_len))
        .collect();
    normalize(&mut out);
    out
}

/// Sort by (start, end, kind), drop empty spans and exact duplicates.
pub fn normalize(spans: &mut Vec<FormatSpan>) {
    spans.retain(|s| !s.is_empty());
    spans.sort();
    spans.dedup();
}

/// Spans that fall entirely inside `[start, end)`, re-based so `start` is 0.
/// Spans straddling a boundary are clipped.
pub fn slice_spans(spans: &[FormatSpan], start: usize, end: usize) -> Vec<FormatSpan> {
    let mut out: Vec<FormatSpan> = spans
        .iter()
        .filter_map(|s| {
            let a = s.start.max(start);
            let b = s.end.min(end);
            (a < b).then(|| FormatSpan::new(a - start, b - start, s.kind))
        })
        .collect();
    normalize(&mut out);
    out
}

/// Spans shifted right by `by` chars.
pub fn shift_spans(spans: &[FormatSpan], by: usize) -> impl Iterator<Item = FormatSpan> + '_ {
    spans
        .iter()
        .map(move |s| FormatSpan::new(s.start + by, s.end + by, s.kind))
}

/// Kinds active at a caret or over a selection.
///
/// A collapsed caret at `offset` reports the kinds of the char before it.
/// A selection reports the kinds that cover every char in it.
pub fn active_formats(spans: &[FormatSpan], start: usize, end: usize) -> Vec<FormatKind> {
    FormatKind::ALL
        .into_iter()
        .filter(|kind| {
            let of_kind = || spans.iter().filter(|s| s.kind == *kind);
            if start >= end {
                start > 0 && of_kind().any(|s| s.contains(start - 1))
            } else {
                (start..end).all(|pos| of_kind().any(|s| s.contains(pos)))
            }
        })
        .collect()
}

/// One run of text with a constant set of active formats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    /// Active kinds in nesting order (bold outermost).
    pub kinds: Vec<FormatKind>,
}

impl Segment {
    pub fn is_plain(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Sweep span boundaries into ordered segments.
///
/// Adjacent runs with the same kind set are coalesced, so equivalent span
/// sets always render identically.
pub fn render(content: &str, spans: &[FormatSpan]) -> Vec<Segment> {
    let len = text::char_len(content);
    if len == 0 {
        return Vec::new();
    }

    let mut bounds: Vec<usize> = Vec::with_capacity(spans.len() * 2 + 2);
    bounds.push(0);
    bounds.push(len);
    for s in spans {
        bounds.push(s.start.min(len));
        bounds.push(s.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut segments: Vec<Segment> = Vec::new();
    for pair in bounds.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mut kinds: Vec<FormatKind> = spans
            .iter()
            .filter(|s| s.contains(a))
            .map(|s| s.kind)
            .collect();
        kinds.sort();
        kinds.dedup();

        let run = text::slice(content, a, b);
        match segments.last_mut() {
            Some(last) if last.kinds == kinds => last.text.push_str(run),
            _ => segments.push(Segment { text: run.to_string(), kinds }),
        }
    }
    segments
}

fn markers(kind: FormatKind) -> (&'static str, &'static str) {
    match kind {
        FormatKind::Bold => ("**", "**"),
        FormatKind::Italic => ("*", "*"),
        FormatKind::Underline => ("<u>", "</u>"),
        FormatKind::Code => ("`", "`"),
    }
}

/// Inline markdown for a block's text.
pub fn to_markdown(content: &str, spans: &[FormatSpan]) -> String {
    let mut out = String::with_capacity(content.len());
    for seg in render(content, spans) {
        for kind in &seg.kinds {
            out.push_str(markers(*kind).0);
        }
        out.push_str(&seg.text);
        for kind in seg.kinds.iter().rev() {
            out.push_str(markers(*kind).1);
        }
    }
    out
}
