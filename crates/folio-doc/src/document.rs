//! Block document model.
//!
//! A [`BlockDocument`] is the ordered block list of one note. Blocks live in
//! a `Vec` (order is the only adjacency) with a `BlockId -> index` map kept
//! in step on every structural change.
//!
//! # Guarantees
//!
//! - The document is never empty. Deleting the last block replaces it with
//!   an empty paragraph.
//! - Every mutation validates first and only then writes, so an `Err`
//!   leaves the document untouched.
//! - Every successful mutation bumps `version` and returns a [`DocChange`]
//!   describing it. The resulting block list is [`BlockDocument::snapshot`];
//!   the command layer hands it back with every mutating
//!   [`CommandOutcome`](crate::CommandOutcome).

use std::collections::HashMap;

use folio_types::{
    Alignment, Block, BlockId, BlockKind, FormatKind, NoteId, Payload, PayloadEdit, PayloadError,
    default_payload,
};
use serde::Serialize;

use crate::cursor::CursorState;
use crate::error::DocError;
use crate::format::{self, Segment};
use crate::ops::DocChange;
use crate::text;
use crate::Result;

/// Immutable view of a document at one version.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentSnapshot {
    /// Note this document belongs to.
    pub note_id: NoteId,
    /// Blocks in order.
    pub blocks: Vec<Block>,
    /// Version.
    pub version: u64,
}

/// The ordered block list of a single note.
#[derive(Debug, Clone)]
pub struct BlockDocument {
    /// Note this document belongs to.
    note_id: NoteId,

    /// Blocks in document order.
    blocks: Vec<Block>,

    /// Position of each block in `blocks`.
    index: HashMap<BlockId, usize>,

    /// Document version (incremented on each mutation).
    version: u64,
}

impl BlockDocument {
    /// A new document holding one empty paragraph.
    pub fn new(note_id: NoteId) -> Self {
        Self::from_blocks(note_id, Vec::new())
    }

    /// Build a document from loaded blocks.
    ///
    /// Each block is sanitized, duplicate ids are replaced with fresh ones,
    /// and an empty list becomes a single empty paragraph.
    pub fn from_blocks(note_id: NoteId, blocks: Vec<Block>) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(blocks.len());
        let mut out = Vec::with_capacity(blocks.len().max(1));
        for mut block in blocks {
            if !seen.insert(block.id) {
                let fresh = BlockId::new();
                tracing::debug!(duplicate = %block.id, fresh = %fresh, "duplicate block id, reassigning");
                block.id = fresh;
                seen.insert(fresh);
            }
            if block.sanitize() {
                tracing::debug!(block = %block.id, kind = %block.kind, "sanitized block on load");
            }
            out.push(block);
        }
        if out.is_empty() {
            out.push(Block::paragraph(""));
        }

        let mut doc = Self {
            note_id,
            blocks: out,
            index: HashMap::new(),
            version: 0,
        };
        doc.reindex();
        doc
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the note ID.
    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    /// Get the current version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the number of blocks (always at least one).
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn first(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// The block before `id`, if any.
    pub fn previous(&self, id: &BlockId) -> Option<&Block> {
        let i = self.index_of(id)?;
        i.checked_sub(1).map(|p| &self.blocks[p])
    }

    /// The block after `id`, if any.
    pub fn next(&self, id: &BlockId) -> Option<&Block> {
        let i = self.index_of(id)?;
        self.blocks.get(i + 1)
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            note_id: self.note_id.clone(),
            blocks: self.blocks.clone(),
            version: self.version,
        }
    }

    /// All block text joined by newlines.
    pub fn full_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short textual fingerprint used by the "worth saving" check.
    ///
    /// Paragraphs contribute their text, every other block contributes its
    /// `[kind]` marker; lines are joined and the result trimmed.
    pub fn content_digest(&self) -> String {
        self.blocks
            .iter()
            .map(|b| match b.kind {
                BlockKind::Paragraph => b.text.clone(),
                kind => format!("[{}]", kind.as_str()),
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Display segments for a block's text.
    pub fn render(&self, id: &BlockId) -> Result<Vec<Segment>> {
        let block = self.get(id)?;
        Ok(format::render(&block.text, &block.formats))
    }

    /// Format kinds active at the cursor (empty for non-text blocks).
    pub fn active_formats(&self, cursor: &CursorState) -> Vec<FormatKind> {
        match self.block(&cursor.block_id) {
            Some(block) if block.kind.is_text() => {
                let (start, end) = cursor.clamp(block.char_len()).range();
                format::active_formats(&block.formats, start, end)
            }
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn reindex(&mut self) {
        self.index.clear();
        for (i, block) in self.blocks.iter().enumerate() {
            self.index.insert(block.id, i);
        }
    }

    fn position(&self, id: &BlockId) -> Result<usize> {
        self.index_of(id).ok_or(DocError::BlockNotFound(*id))
    }

    fn get(&self, id: &BlockId) -> Result<&Block> {
        self.block(id).ok_or(DocError::BlockNotFound(*id))
    }

    /// Position of a text-bearing block.
    fn text_position(&self, id: &BlockId) -> Result<usize> {
        let i = self.position(id)?;
        let kind = self.blocks[i].kind;
        if !kind.is_text() {
            return Err(DocError::NotTextBlock { id: *id, kind });
        }
        Ok(i)
    }

    fn check_payload(&self, block: &Block, payload: &Payload) -> Result<()> {
        if !payload.matches(block.kind) {
            return Err(DocError::PayloadMismatch {
                id: block.id,
                kind: block.kind,
                payload: payload.kind(),
            });
        }
        Ok(())
    }

    fn commit(&mut self, change: DocChange) -> DocChange {
        self.version += 1;
        tracing::trace!(version = self.version, change = change.name(), block = %change.target_block(), "document changed");
        change
    }

    // =========================================================================
    // Structural Operations
    // =========================================================================

    /// Insert a block of `kind` at the cursor.
    ///
    /// - no cursor: append at the end
    /// - caret strictly inside a text block: split there; the new block goes
    ///   between the halves and the trailing half becomes a paragraph
    /// - caret at offset 0 of a text block: insert before it
    /// - otherwise: insert after the cursor's block
    ///
    /// A missing payload means the kind's default.
    pub fn insert_block(
        &mut self,
        kind: BlockKind,
        at: Option<&CursorState>,
        payload: Option<Payload>,
    ) -> Result<DocChange> {
        let mut block = Block::new(kind);
        if let Some(payload) = payload {
            self.check_payload(&block, &payload)?;
            block.payload = Some(payload);
        }
        let id = block.id;

        let Some(cursor) = at else {
            let index = self.blocks.len();
            self.blocks.push(block);
            self.reindex();
            return Ok(self.commit(DocChange::Inserted { id, index, tail: None }));
        };

        let i = self.position(&cursor.block_id)?;
        let target = &self.blocks[i];
        let len = target.char_len();

        if !target.kind.is_text() {
            self.blocks.insert(i + 1, block);
            self.reindex();
            return Ok(self.commit(DocChange::Inserted { id, index: i + 1, tail: None }));
        }

        let p = cursor.offset;
        if p > len {
            return Err(DocError::OffsetOutOfBounds { offset: p, len });
        }

        if p > 0 && p < len {
            let target = &mut self.blocks[i];
            let (head, tail) = text::split_at(&target.text, p);
            let tail_block = Block::paragraph(tail.to_string())
                .with_formats(format::slice_spans(&target.formats, p, len));
            let tail_id = tail_block.id;
            target.text = head.to_string();
            target.formats = format::slice_spans(&target.formats, 0, p);

            self.blocks.insert(i + 1, block);
            self.blocks.insert(i + 2, tail_block);
            self.reindex();
            return Ok(self.commit(DocChange::Inserted {
                id,
                index: i + 1,
                tail: Some(tail_id),
            }));
        }

        let index = if p == 0 { i } else { i + 1 };
        self.blocks.insert(index, block);
        self.reindex();
        Ok(self.commit(DocChange::Inserted { id, index, tail: None }))
    }

    /// Split a text block at `offset`.
    ///
    /// The source keeps `[0, offset)`; a new successor holds the rest with
    /// its spans re-based to 0. List items continue the list, every other
    /// kind continues as a paragraph. An empty list item (see
    /// [`Block::is_empty_list_item`]) is converted to a paragraph instead.
    pub fn split_at_cursor(&mut self, id: &BlockId, offset: usize) -> Result<DocChange> {
        let i = self.text_position(id)?;
        let source = &mut self.blocks[i];
        let len = source.char_len();
        if offset > len {
            return Err(DocError::OffsetOutOfBounds { offset, len });
        }

        if source.is_empty_list_item() {
            source.kind = BlockKind::Paragraph;
            return Ok(self.commit(DocChange::ListExited { id: *id }));
        }

        let successor_kind = if source.kind.is_list() {
            source.kind
        } else {
            BlockKind::Paragraph
        };
        let (head, tail) = text::split_at(&source.text, offset);
        let successor = Block::new(successor_kind)
            .with_text(tail.to_string())
            .with_formats(format::slice_spans(&source.formats, offset, len));
        let created = successor.id;
        source.text = head.to_string();
        source.formats = format::slice_spans(&source.formats, 0, offset);

        self.blocks.insert(i + 1, successor);
        self.reindex();
        Ok(self.commit(DocChange::Split { source: *id, created }))
    }

    /// Append `id` to the text block before it and remove `id`.
    pub fn merge_with_previous(&mut self, id: &BlockId) -> Result<DocChange> {
        let i = self.text_position(id)?;
        if i == 0 || !self.blocks[i - 1].kind.is_text() {
            return Err(DocError::NoPreviousBlock(*id));
        }
        let removed = self.blocks.remove(i);
        let into = &mut self.blocks[i - 1];
        let join_offset = join(into, &removed);
        let into_id = into.id;
        self.reindex();
        Ok(self.commit(DocChange::Merged {
            into: into_id,
            removed: removed.id,
            join_offset,
        }))
    }

    /// Append the text block after `id` to `id` and remove it.
    pub fn merge_with_next(&mut self, id: &BlockId) -> Result<DocChange> {
        let i = self.text_position(id)?;
        if !self.blocks.get(i + 1).is_some_and(|b| b.kind.is_text()) {
            return Err(DocError::NoNextBlock(*id));
        }
        let removed = self.blocks.remove(i + 1);
        let join_offset = join(&mut self.blocks[i], &removed);
        self.reindex();
        Ok(self.commit(DocChange::Merged {
            into: *id,
            removed: removed.id,
            join_offset,
        }))
    }

    /// Delete a block. The last remaining block is replaced by an empty paragraph.
    pub fn delete_block(&mut self, id: &BlockId) -> Result<DocChange> {
        let index = self.position(id)?;
        self.blocks.remove(index);
        let replacement = if self.blocks.is_empty() {
            let fresh = Block::paragraph("");
            let fresh_id = fresh.id;
            self.blocks.push(fresh);
            Some(fresh_id)
        } else {
            None
        };
        self.reindex();
        Ok(self.commit(DocChange::Deleted { id: *id, index, replacement }))
    }

    /// Change a block's kind.
    ///
    /// Text and spans survive only between text-bearing kinds. Moving to or
    /// from a payload kind resets the payload to the new kind's default.
    pub fn retype(&mut self, id: &BlockId, kind: BlockKind) -> Result<DocChange> {
        let i = self.position(id)?;
        let block = &mut self.blocks[i];
        let from = block.kind;
        if from != kind {
            if !(from.is_text() && kind.is_text()) {
                block.text.clear();
                block.formats.clear();
            }
            block.kind = kind;
            block.payload = default_payload(kind);
        }
        Ok(self.commit(DocChange::Retyped { id: *id, from, to: kind }))
    }

    pub fn set_alignment(&mut self, id: &BlockId, alignment: Alignment) -> Result<DocChange> {
        let i = self.position(id)?;
        self.blocks[i].alignment = alignment;
        Ok(self.commit(DocChange::Realigned { id: *id, alignment }))
    }

    /// Move a block to `new_index` (clamped to the last position).
    ///
    /// Moving a block onto its own index changes nothing and does not bump
    /// the version.
    pub fn reorder(&mut self, id: &BlockId, new_index: usize) -> Result<DocChange> {
        let from = self.position(id)?;
        let to = new_index.min(self.blocks.len() - 1);
        let change = DocChange::Moved { id: *id, from, to };
        if from == to {
            return Ok(change);
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        self.reindex();
        Ok(self.commit(change))
    }

    // =========================================================================
    // Text Operations
    // =========================================================================

    /// Replace chars `[start, end)` of a text block with `inserted`.
    ///
    /// Spans are adjusted before the new text is committed.
    pub fn edit_text(
        &mut self,
        id: &BlockId,
        start: usize,
        end: usize,
        inserted: &str,
    ) -> Result<DocChange> {
        let i = self.text_position(id)?;
        let block = &mut self.blocks[i];
        let len = block.char_len();
        if start > end || end > len {
            return Err(DocError::RangeOutOfBounds { start, end, len });
        }

        let inserted_len = text::char_len(inserted);
        let new_len = len - (end - start) + inserted_len;
        block.formats = format::adjust_for_edit(&block.formats, start, end, inserted_len, new_len);
        block.text = text::replace_range(&block.text, start, end, inserted);

        Ok(self.commit(DocChange::TextEdited {
            id: *id,
            start,
            deleted: end - start,
            inserted: inserted_len,
        }))
    }

    /// Remove all text (and therefore all spans) from a text block.
    pub fn clear_text(&mut self, id: &BlockId) -> Result<DocChange> {
        let len = self.get(id)?.char_len();
        self.edit_text(id, 0, len, "")
    }

    /// Toggle a format span over `[start, end)`.
    ///
    /// Returns `Ok(None)` for an empty range, which changes nothing.
    pub fn apply_format(
        &mut self,
        id: &BlockId,
        kind: FormatKind,
        start: usize,
        end: usize,
    ) -> Result<Option<DocChange>> {
        let i = self.text_position(id)?;
        let block = &mut self.blocks[i];
        let len = block.char_len();
        if start > end || end > len {
            return Err(DocError::RangeOutOfBounds { start, end, len });
        }
        match format::toggle_format(&mut block.formats, kind, start, end) {
            Some(enabled) => Ok(Some(self.commit(DocChange::FormatToggled { id: *id, kind, enabled }))),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Payload Operations
    // =========================================================================

    /// Replace a block's payload.
    pub fn set_payload(&mut self, id: &BlockId, payload: Payload) -> Result<DocChange> {
        let i = self.position(id)?;
        self.check_payload(&self.blocks[i], &payload)?;
        self.blocks[i].payload = Some(payload);
        Ok(self.commit(DocChange::PayloadUpdated { id: *id }))
    }

    /// Edit a block's payload in place with `f`.
    ///
    /// `f` runs on a copy; nothing is written unless it succeeds and the
    /// result still fits the block's kind.
    pub fn update_payload<F>(&mut self, id: &BlockId, f: F) -> Result<DocChange>
    where
        F: FnOnce(&mut Payload) -> std::result::Result<(), PayloadError>,
    {
        let i = self.position(id)?;
        let block = &self.blocks[i];
        let Some(mut payload) = block.payload.clone() else {
            return Err(PayloadError::NoPayload(block.kind).into());
        };
        f(&mut payload)?;
        self.check_payload(block, &payload)?;
        self.blocks[i].payload = Some(payload);
        Ok(self.commit(DocChange::PayloadUpdated { id: *id }))
    }

    /// Apply a [`PayloadEdit`] to a block's payload.
    pub fn edit_payload(&mut self, id: &BlockId, edit: &PayloadEdit) -> Result<DocChange> {
        let block = self.get(id)?;
        if edit.target() != block.kind {
            return Err(DocError::PayloadMismatch {
                id: *id,
                kind: block.kind,
                payload: edit.target(),
            });
        }
        self.update_payload(id, |p| p.apply(edit))
    }
}

/// Append `tail` to `into`, re-basing its spans. Returns the join offset.
fn join(into: &mut Block, tail: &Block) -> usize {
    let join_offset = into.char_len();
    into.text.push_str(&tail.text);
    into.formats.extend(format::shift_spans(&tail.formats, join_offset));
    format::normalize(&mut into.formats);
    join_offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::FormatSpan;

    fn doc_of(blocks: Vec<Block>) -> BlockDocument {
        BlockDocument::from_blocks(NoteId::from("note-1"), blocks)
    }

    fn id_at(doc: &BlockDocument, i: usize) -> BlockId {
        doc.blocks()[i].id
    }

    fn texts(doc: &BlockDocument) -> Vec<&str> {
        doc.blocks().iter().map(|b| b.text.as_str()).collect()
    }

    fn bold(start: usize, end: usize) -> FormatSpan {
        FormatSpan::new(start, end, FormatKind::Bold)
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn test_new_document_has_one_empty_paragraph() {
        let doc = BlockDocument::new(NoteId::from("n"));
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.first().kind, BlockKind::Paragraph);
        assert!(doc.first().text.is_empty());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_from_blocks_reassigns_duplicate_ids() {
        let a = Block::paragraph("a");
        let mut b = Block::paragraph("b");
        b.id = a.id;
        let doc = doc_of(vec![a.clone(), b]);
        assert_eq!(doc.block_count(), 2);
        assert_eq!(id_at(&doc, 0), a.id);
        assert_ne!(id_at(&doc, 1), a.id);
        assert_eq!(doc.index_of(&id_at(&doc, 1)), Some(1));
    }

    #[test]
    fn test_from_blocks_sanitizes() {
        let block = Block::paragraph("abc").with_formats(vec![bold(0, 9)]);
        let doc = doc_of(vec![block]);
        assert!(doc.first().formats.is_empty());
    }

    // ── The worked example ──────────────────────────────────────────────

    #[test]
    fn test_insert_then_split_example() {
        let mut doc = doc_of(vec![Block::paragraph("hello world").with_formats(vec![bold(0, 5)])]);
        let id = id_at(&doc, 0);

        doc.edit_text(&id, 2, 2, "X").unwrap();
        assert_eq!(doc.first().text, "heXllo world");
        assert_eq!(doc.first().formats, vec![bold(0, 6)]);

        let change = doc.split_at_cursor(&id, 6).unwrap();
        let DocChange::Split { created, .. } = change else { panic!("expected split") };
        assert_eq!(texts(&doc), vec!["heXllo", " world"]);
        assert_eq!(doc.first().formats, vec![bold(0, 6)]);
        assert!(doc.block(&created).unwrap().formats.is_empty());
    }

    // ── Split ───────────────────────────────────────────────────────────

    #[test]
    fn test_split_rebases_trailing_spans() {
        let mut doc = doc_of(vec![Block::paragraph("abcdef").with_formats(vec![bold(1, 5)])]);
        let id = id_at(&doc, 0);
        doc.split_at_cursor(&id, 3).unwrap();
        assert_eq!(doc.blocks()[0].formats, vec![bold(1, 3)]);
        assert_eq!(doc.blocks()[1].formats, vec![bold(0, 2)]);
    }

    #[test]
    fn test_split_heading_continues_as_paragraph() {
        let mut doc = doc_of(vec![
            Block::new(BlockKind::Heading1).with_text("Title").with_alignment(Alignment::Center),
        ]);
        let id = id_at(&doc, 0);
        doc.split_at_cursor(&id, 5).unwrap();
        assert_eq!(doc.blocks()[1].kind, BlockKind::Paragraph);
        assert_eq!(doc.blocks()[1].alignment, Alignment::Left);
        assert!(doc.blocks()[1].text.is_empty());
    }

    #[test]
    fn test_split_list_item_continues_list() {
        let mut doc = doc_of(vec![Block::new(BlockKind::BulletedItem).with_text("one")]);
        let id = id_at(&doc, 0);
        doc.split_at_cursor(&id, 3).unwrap();
        assert_eq!(doc.blocks()[1].kind, BlockKind::BulletedItem);
    }

    #[test]
    fn test_split_empty_list_item_exits_list() {
        let mut doc = doc_of(vec![Block::new(BlockKind::NumberedItem).with_text("  ")]);
        let id = id_at(&doc, 0);
        let change = doc.split_at_cursor(&id, 0).unwrap();
        assert_eq!(change, DocChange::ListExited { id });
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.first().kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_split_rejects_non_text_and_bad_offset() {
        let mut doc = doc_of(vec![Block::new(BlockKind::Divider), Block::paragraph("ab")]);
        let divider = id_at(&doc, 0);
        let para = id_at(&doc, 1);
        assert!(matches!(doc.split_at_cursor(&divider, 0), Err(DocError::NotTextBlock { .. })));
        assert!(matches!(
            doc.split_at_cursor(&para, 3),
            Err(DocError::OffsetOutOfBounds { offset: 3, len: 2 })
        ));
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.block_count(), 2);
    }

    #[test]
    fn test_split_multibyte() {
        let mut doc = doc_of(vec![Block::paragraph("añb👋c")]);
        let id = id_at(&doc, 0);
        doc.split_at_cursor(&id, 3).unwrap();
        assert_eq!(texts(&doc), vec!["añb", "👋c"]);
    }

    // ── Merge ───────────────────────────────────────────────────────────

    #[test]
    fn test_split_then_merge_restores() {
        let original = Block::paragraph("hello world").with_formats(vec![
            bold(0, 8),
            FormatSpan::new(4, 11, FormatKind::Italic),
        ]);
        let mut doc = doc_of(vec![original.clone()]);
        let id = id_at(&doc, 0);
        let before = doc.render(&id).unwrap();

        let DocChange::Split { created, .. } = doc.split_at_cursor(&id, 6).unwrap() else {
            panic!("expected split")
        };
        let change = doc.merge_with_previous(&created).unwrap();
        assert_eq!(change, DocChange::Merged { into: id, removed: created, join_offset: 6 });
        assert_eq!(doc.first().text, original.text);
        assert_eq!(doc.render(&id).unwrap(), before);
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_merge_with_next() {
        let mut doc = doc_of(vec![
            Block::paragraph("ab"),
            Block::new(BlockKind::Quote).with_text("cd").with_formats(vec![bold(0, 1)]),
        ]);
        let first = id_at(&doc, 0);
        let change = doc.merge_with_next(&first).unwrap();
        assert!(matches!(change, DocChange::Merged { join_offset: 2, .. }));
        assert_eq!(texts(&doc), vec!["abcd"]);
        assert_eq!(doc.first().formats, vec![bold(2, 3)]);
        assert_eq!(doc.first().kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_merge_rejects_non_text_neighbours() {
        let mut doc = doc_of(vec![
            Block::new(BlockKind::Table),
            Block::paragraph("x"),
            Block::new(BlockKind::Image),
        ]);
        let para = id_at(&doc, 1);
        assert!(matches!(doc.merge_with_previous(&para), Err(DocError::NoPreviousBlock(_))));
        assert!(matches!(doc.merge_with_next(&para), Err(DocError::NoNextBlock(_))));
        let mut first = doc_of(vec![Block::paragraph("a")]);
        let only = id_at(&first, 0);
        assert!(matches!(first.merge_with_previous(&only), Err(DocError::NoPreviousBlock(_))));
        assert_eq!(doc.block_count(), 3);
    }

    // ── Insert ──────────────────────────────────────────────────────────

    #[test]
    fn test_insert_mid_text_splits_around_new_block() {
        let mut doc = doc_of(vec![Block::paragraph("abcdef").with_formats(vec![bold(2, 5)])]);
        let id = id_at(&doc, 0);
        let change = doc
            .insert_block(BlockKind::Table, Some(&CursorState::new(id, 3)), None)
            .unwrap();
        let DocChange::Inserted { id: table, index, tail: Some(tail) } = change else {
            panic!("expected split insert")
        };
        assert_eq!(index, 1);
        assert_eq!(doc.blocks()[1].id, table);
        assert_eq!(doc.blocks()[2].id, tail);
        assert_eq!(texts(&doc), vec!["abc", "", "def"]);
        assert_eq!(doc.blocks()[0].formats, vec![bold(2, 3)]);
        assert_eq!(doc.blocks()[2].formats, vec![bold(0, 2)]);
        assert_eq!(doc.blocks()[2].kind, BlockKind::Paragraph);
        assert!(matches!(doc.blocks()[1].payload, Some(Payload::Table(_))));
    }

    #[test]
    fn test_insert_at_start_goes_before() {
        let mut doc = doc_of(vec![Block::paragraph("abc")]);
        let id = id_at(&doc, 0);
        doc.insert_block(BlockKind::Divider, Some(&CursorState::new(id, 0)), None).unwrap();
        assert_eq!(doc.blocks()[0].kind, BlockKind::Divider);
        assert_eq!(doc.blocks()[1].id, id);
    }

    #[test]
    fn test_insert_at_end_or_without_cursor_goes_after() {
        let mut doc = doc_of(vec![Block::paragraph("abc"), Block::paragraph("z")]);
        let id = id_at(&doc, 0);
        doc.insert_block(BlockKind::Quote, Some(&CursorState::new(id, 3)), None).unwrap();
        assert_eq!(doc.blocks()[1].kind, BlockKind::Quote);

        doc.insert_block(BlockKind::Checklist, None, None).unwrap();
        assert_eq!(doc.last().kind, BlockKind::Checklist);
    }

    #[test]
    fn test_insert_after_non_text_block() {
        let mut doc = doc_of(vec![Block::new(BlockKind::Image), Block::paragraph("z")]);
        let image = id_at(&doc, 0);
        doc.insert_block(BlockKind::Divider, Some(&CursorState::new(image, 0)), None).unwrap();
        assert_eq!(doc.blocks()[1].kind, BlockKind::Divider);
    }

    #[test]
    fn test_insert_rejects_mismatched_payload() {
        let mut doc = BlockDocument::new("n".into());
        let wrong = default_payload(BlockKind::Image).unwrap();
        assert!(matches!(
            doc.insert_block(BlockKind::Table, None, Some(wrong)),
            Err(DocError::PayloadMismatch { .. })
        ));
        assert_eq!(doc.block_count(), 1);
    }

    // ── Delete ──────────────────────────────────────────────────────────

    #[test]
    fn test_delete_last_block_leaves_empty_paragraph() {
        let mut doc = doc_of(vec![Block::new(BlockKind::Table)]);
        let id = id_at(&doc, 0);
        let change = doc.delete_block(&id).unwrap();
        let DocChange::Deleted { replacement: Some(fresh), .. } = change else {
            panic!("expected replacement")
        };
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.first().id, fresh);
        assert_eq!(doc.first().kind, BlockKind::Paragraph);
        assert!(doc.block(&id).is_none());
    }

    #[test]
    fn test_never_empty_after_delete_and_merge_sequences() {
        let mut doc = doc_of(vec![
            Block::paragraph("a"),
            Block::paragraph("b"),
            Block::new(BlockKind::Divider),
            Block::paragraph("c"),
        ]);
        for round in 0..10 {
            let id = id_at(&doc, 0);
            if round % 2 == 0 {
                let _ = doc.merge_with_next(&id);
            }
            doc.delete_block(&id_at(&doc, 0)).unwrap();
            assert!(doc.block_count() >= 1);
            for (i, b) in doc.blocks().iter().enumerate() {
                assert_eq!(doc.index_of(&b.id), Some(i));
            }
        }
    }

    // ── Retype / align / reorder ────────────────────────────────────────

    #[test]
    fn test_retype_between_text_kinds_keeps_text() {
        let mut doc = doc_of(vec![Block::paragraph("abc").with_formats(vec![bold(0, 1)])]);
        let id = id_at(&doc, 0);
        doc.retype(&id, BlockKind::Heading2).unwrap();
        assert_eq!(doc.first().text, "abc");
        assert_eq!(doc.first().formats, vec![bold(0, 1)]);
        assert!(doc.first().payload.is_none());
    }

    #[test]
    fn test_retype_to_and_from_payload_kind() {
        let mut doc = doc_of(vec![Block::paragraph("abc")]);
        let id = id_at(&doc, 0);
        doc.retype(&id, BlockKind::Checklist).unwrap();
        assert!(doc.first().text.is_empty());
        assert!(matches!(doc.first().payload, Some(Payload::Checklist(_))));

        doc.retype(&id, BlockKind::Table).unwrap();
        assert!(matches!(doc.first().payload, Some(Payload::Table(_))));

        doc.retype(&id, BlockKind::Quote).unwrap();
        assert!(doc.first().payload.is_none());
        assert_eq!(doc.first().kind, BlockKind::Quote);
    }

    #[test]
    fn test_set_alignment() {
        let mut doc = doc_of(vec![Block::paragraph("abc")]);
        let id = id_at(&doc, 0);
        doc.set_alignment(&id, Alignment::Right).unwrap();
        assert_eq!(doc.first().alignment, Alignment::Right);
    }

    #[test]
    fn test_reorder_is_a_permutation() {
        let blocks: Vec<Block> = (0..5).map(|i| Block::paragraph(i.to_string())).collect();
        let mut doc = doc_of(blocks);
        let mut before: Vec<BlockId> = doc.blocks().iter().map(|b| b.id).collect();

        let moving = id_at(&doc, 1);
        let change = doc.reorder(&moving, 3).unwrap();
        assert_eq!(change, DocChange::Moved { id: moving, from: 1, to: 3 });
        assert_eq!(texts(&doc), vec!["0", "2", "3", "1", "4"]);

        let mut after: Vec<BlockId> = doc.blocks().iter().map(|b| b.id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reorder_clamps_and_same_index_is_noop() {
        let mut doc = doc_of(vec![Block::paragraph("a"), Block::paragraph("b")]);
        let a = id_at(&doc, 0);
        doc.reorder(&a, 99).unwrap();
        assert_eq!(texts(&doc), vec!["b", "a"]);
        let version = doc.version();
        doc.reorder(&a, 1).unwrap();
        assert_eq!(doc.version(), version);
    }

    // ── Text / formats ──────────────────────────────────────────────────

    #[test]
    fn test_edit_text_range_checks() {
        let mut doc = doc_of(vec![Block::paragraph("abc")]);
        let id = id_at(&doc, 0);
        assert!(matches!(doc.edit_text(&id, 2, 5, ""), Err(DocError::RangeOutOfBounds { .. })));
        assert!(matches!(doc.edit_text(&id, 2, 1, ""), Err(DocError::RangeOutOfBounds { .. })));
        assert_eq!(doc.first().text, "abc");
    }

    #[test]
    fn test_clear_text_drops_spans() {
        let mut doc = doc_of(vec![Block::paragraph("abc").with_formats(vec![bold(0, 3)])]);
        let id = id_at(&doc, 0);
        doc.clear_text(&id).unwrap();
        assert!(doc.first().text.is_empty());
        assert!(doc.first().formats.is_empty());
    }

    #[test]
    fn test_apply_format_toggles() {
        let mut doc = doc_of(vec![Block::paragraph("abc")]);
        let id = id_at(&doc, 0);
        let on = doc.apply_format(&id, FormatKind::Bold, 0, 2).unwrap();
        assert!(matches!(on, Some(DocChange::FormatToggled { enabled: true, .. })));
        assert_eq!(doc.active_formats(&CursorState::new(id, 1)), vec![FormatKind::Bold]);

        let off = doc.apply_format(&id, FormatKind::Bold, 0, 2).unwrap();
        assert!(matches!(off, Some(DocChange::FormatToggled { enabled: false, .. })));
        assert!(doc.first().formats.is_empty());

        let version = doc.version();
        assert!(doc.apply_format(&id, FormatKind::Bold, 1, 1).unwrap().is_none());
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_content_digest_and_full_text() {
        let doc = doc_of(vec![
            Block::paragraph("  hi"),
            Block::new(BlockKind::Table),
            Block::new(BlockKind::Heading1).with_text("T"),
        ]);
        assert_eq!(doc.content_digest(), "hi\n[table]\n[heading1]");
        assert_eq!(doc.full_text(), "  hi\n\nT");
    }

    // ── Payloads ────────────────────────────────────────────────────────

    #[test]
    fn test_edit_payload() {
        let mut doc = doc_of(vec![Block::new(BlockKind::Table)]);
        let id = id_at(&doc, 0);
        doc.edit_payload(&id, &PayloadEdit::AddRow { after: None }).unwrap();
        let Some(Payload::Table(t)) = &doc.first().payload else { panic!("no table") };
        assert_eq!(t.rows.len(), 3);

        assert!(matches!(
            doc.edit_payload(&id, &PayloadEdit::ToggleAll),
            Err(DocError::PayloadMismatch { .. })
        ));
        let version = doc.version();
        assert!(matches!(
            doc.edit_payload(&id, &PayloadEdit::RemoveRow { index: 9 }),
            Err(DocError::Payload(PayloadError::RowOutOfRange { .. }))
        ));
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_set_payload_kind_must_match() {
        let mut doc = doc_of(vec![Block::paragraph("x"), Block::new(BlockKind::Image)]);
        let para = id_at(&doc, 0);
        let image = id_at(&doc, 1);
        let payload = default_payload(BlockKind::Image).unwrap();
        assert!(doc.set_payload(&para, payload.clone()).is_err());
        assert!(doc.set_payload(&image, payload).is_ok());
    }

    #[test]
    fn test_update_payload_on_text_block_fails() {
        let mut doc = doc_of(vec![Block::paragraph("x")]);
        let id = id_at(&doc, 0);
        let result = doc.update_payload(&id, |_| Ok(()));
        assert!(matches!(result, Err(DocError::Payload(PayloadError::NoPayload(BlockKind::Paragraph)))));
    }

    #[test]
    fn test_snapshot_tracks_version() {
        let mut doc = BlockDocument::new("n".into());
        let id = id_at(&doc, 0);
        let s0 = doc.snapshot();
        doc.edit_text(&id, 0, 0, "hi").unwrap();
        let s1 = doc.snapshot();
        assert!(s1.version > s0.version);
        assert_eq!(s0.blocks[0].text, "");
        assert_eq!(s1.blocks[0].text, "hi");
    }

    #[test]
    fn test_unknown_block() {
        let mut doc = BlockDocument::new("n".into());
        let ghost = BlockId::new();
        assert!(matches!(doc.delete_block(&ghost), Err(DocError::BlockNotFound(_))));
        assert!(matches!(doc.retype(&ghost, BlockKind::Quote), Err(DocError::BlockNotFound(_))));
        assert!(doc.render(&ghost).is_err());
    }
}
