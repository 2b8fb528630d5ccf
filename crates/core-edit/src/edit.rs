//! Edit primitives over a text buffer.
//!
//! Every inserted byte is appended once into the current add-buffer (an
//! arena slot in the registry) and referenced by chunks from then on.
//! When an add-buffer fills up, a larger one is registered and becomes
//! current; old ones stay live because existing chunks still point into
//! them. Resource acquisition happens before the rope is touched, so a
//! failed insert leaves the buffer exactly as it was.

use crate::buffer::{BufferOptions, TextBuffer};
use crate::cursor::{self, Cursor};
use crate::EditError;
use core_mem::MemId;
use core_rope::{Segment, prev_grapheme_width, grapheme_width_at};
use core_scan::{LineBreakKind, WidthOracle, find_line_breaks};
use tracing::debug;

/// Initial add-buffer capacity; doubled on each overflow.
const ADD_BUFFER_INITIAL: usize = 64 * 1024;

/// Editing front end: add-buffer, cursors, and the edit operations.
pub struct EditBuffer {
    buffer: TextBuffer,
    add_id: MemId,
    add_capacity: usize,
    /// Primary cursor at index 0; additional cursors follow.
    cursors: Vec<Cursor>,
}

impl EditBuffer {
    pub fn new(buffer: TextBuffer) -> Result<Self, EditError> {
        let mut buffer = buffer;
        let add_id = buffer.registry_mut().register_arena(ADD_BUFFER_INITIAL)?;
        Ok(Self {
            buffer,
            add_id,
            add_capacity: ADD_BUFFER_INITIAL,
            cursors: vec![Cursor::default()],
        })
    }

    pub fn with_defaults() -> Result<Self, EditError> {
        Self::new(TextBuffer::with_defaults()?)
    }

    pub fn with_options(
        oracle: Box<dyn WidthOracle>,
        options: BufferOptions,
    ) -> Result<Self, EditError> {
        Self::new(TextBuffer::new(oracle, options)?)
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    /// Buffer and primary cursor, for motion helpers.
    pub fn parts_mut(&mut self) -> (&mut TextBuffer, &mut Cursor) {
        (&mut self.buffer, &mut self.cursors[0])
    }

    pub fn get_primary_cursor(&self) -> Cursor {
        self.cursors[0]
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    /// Place the primary cursor; fails with `InvalidCursor` off the text.
    pub fn set_cursor(&mut self, row: usize, col: usize) -> Result<(), EditError> {
        self.buffer
            .coords_to_offset(row, col)
            .ok_or(EditError::InvalidCursor)?;
        self.cursors[0] = Cursor::new(row, col);
        Ok(())
    }

    /// Reserve add-buffer space, rolling over to a doubled arena slot
    /// when the current one cannot take `len` more bytes.
    fn reserve_add_capacity(&mut self, len: usize) -> Result<(), EditError> {
        let remaining = self.buffer.registry().arena_remaining(self.add_id)?;
        if remaining >= len {
            return Ok(());
        }
        let mut capacity = self.add_capacity;
        while capacity < len {
            capacity *= 2;
        }
        capacity *= 2;
        let add_id = self.buffer.registry_mut().register_arena(capacity)?;
        debug!(capacity, "add-buffer rollover");
        self.add_id = add_id;
        self.add_capacity = capacity;
        Ok(())
    }

    /// Insert text at the primary cursor.
    ///
    /// Hard breaks in the input become `Break`+`LineStart` segment pairs;
    /// CR and CRLF are normalized away (no chunk covers their bytes). The
    /// cursor lands just past the inserted content.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        let at = self.cursors[0];
        let offset = self
            .buffer
            .coords_to_offset(at.row, at.col)
            .ok_or(EditError::InvalidCursor)?;
        if text.is_empty() {
            return Ok(());
        }
        // All fallible resource work happens before the rope changes.
        self.reserve_add_capacity(text.len())?;
        let (start, _) = self
            .buffer
            .registry_mut()
            .arena_append(self.add_id, text.as_bytes())?;

        let bytes = text.as_bytes();
        let mut segs: Vec<Segment> = Vec::new();
        let mut inserted_width = 0usize;
        let mut cur = 0usize;
        let push_chunk = |buffer: &TextBuffer,
                              segs: &mut Vec<Segment>,
                              width: &mut usize,
                              from: usize,
                              to: usize|
         -> Result<(), EditError> {
            if to > from {
                let chunk = buffer.create_chunk(self.add_id, start + from, start + to)?;
                *width += chunk.width();
                segs.push(Segment::Text(chunk));
            }
            Ok(())
        };
        for lb in find_line_breaks(bytes) {
            let text_end = match lb.kind {
                LineBreakKind::CrLf => lb.pos - 1,
                _ => lb.pos,
            };
            push_chunk(&self.buffer, &mut segs, &mut inserted_width, cur, text_end)?;
            segs.push(Segment::Break);
            segs.push(Segment::LineStart);
            inserted_width += 1;
            cur = lb.pos + 1;
        }
        push_chunk(
            &self.buffer,
            &mut segs,
            &mut inserted_width,
            cur,
            bytes.len(),
        )?;

        self.buffer.insert_slice_at(offset, segs)?;
        self.buffer.mark_views_dirty();
        let (row, col) = self
            .buffer
            .offset_to_coords(offset + inserted_width)
            .ok_or(EditError::InvalidCursor)?;
        self.cursors[0] = Cursor::new(row, col);
        debug!(offset, width = inserted_width, "insert");
        Ok(())
    }

    /// Delete the text between two cursor positions (order-insensitive).
    pub fn delete_range(
        &mut self,
        start: (usize, usize),
        end: (usize, usize),
    ) -> Result<(), EditError> {
        let (mut a, mut b) = (start, end);
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let from = self
            .buffer
            .coords_to_offset(a.0, a.1)
            .ok_or(EditError::InvalidCursor)?;
        let to = self
            .buffer
            .coords_to_offset(b.0, b.1)
            .ok_or(EditError::InvalidCursor)?;
        self.buffer.delete_weight_range(from, to)?;
        self.buffer.mark_views_dirty();
        self.cursors[0] = Cursor::new(a.0, a.1);
        debug!(from, to, "delete range");
        Ok(())
    }

    /// Delete the `Break` before line `row` together with the
    /// `LineStart` that follows it, joining `row` onto the line above.
    fn delete_line_break_before(&mut self, row: usize) -> Result<(), EditError> {
        let marker = self
            .buffer
            .rope_mut()
            .get_marker(row)
            .ok_or(EditError::InvalidCursor)?;
        let break_index = marker.seg_index - 1;
        let rope = self.buffer.rope_mut();
        let removed = rope.delete(break_index)?;
        debug_assert!(removed.is_break());
        // The paired LineStart slid into the vacated index.
        if rope.get(break_index).is_some_and(Segment::is_line_start) {
            rope.delete(break_index)?;
        }
        rope.rebalance();
        Ok(())
    }

    /// Delete one grapheme leftward, or join with the previous line at
    /// column 0. At the buffer origin this is a no-op.
    pub fn backspace(&mut self) -> Result<(), EditError> {
        let at = self.cursors[0];
        if at.row == 0 && at.col == 0 {
            return Ok(());
        }
        if at.col == 0 {
            let prev_width = self
                .buffer
                .line_width(at.row - 1)
                .ok_or(EditError::InvalidCursor)?;
            self.delete_line_break_before(at.row)?;
            self.cursors[0] = Cursor::new(at.row - 1, prev_width);
        } else {
            let policy_width = {
                let policy = self.buffer.policy();
                prev_grapheme_width(
                    self.buffer.rope(),
                    self.buffer.registry(),
                    at.row,
                    at.col,
                    &policy,
                )
                .unwrap_or(1)
            };
            let offset = self
                .buffer
                .coords_to_offset(at.row, at.col)
                .ok_or(EditError::InvalidCursor)?;
            self.buffer
                .delete_weight_range(offset - policy_width, offset)?;
            self.cursors[0] = Cursor::new(at.row, at.col - policy_width);
        }
        self.buffer.mark_views_dirty();
        debug!(row = at.row, col = at.col, "backspace");
        Ok(())
    }

    /// Delete one grapheme rightward, or join the next line at line end.
    /// The cursor stays put.
    pub fn delete_forward(&mut self) -> Result<(), EditError> {
        let at = self.cursors[0];
        let width = self
            .buffer
            .line_width(at.row)
            .ok_or(EditError::InvalidCursor)?;
        if at.col >= width {
            if at.row + 1 >= self.buffer.get_line_count() {
                return Ok(());
            }
            self.delete_line_break_before(at.row + 1)?;
        } else {
            let grapheme_width = {
                let policy = self.buffer.policy();
                grapheme_width_at(
                    self.buffer.rope(),
                    self.buffer.registry(),
                    at.row,
                    at.col,
                    &policy,
                )
                .unwrap_or(1)
            };
            let offset = self
                .buffer
                .coords_to_offset(at.row, at.col)
                .ok_or(EditError::InvalidCursor)?;
            self.buffer
                .delete_weight_range(offset, offset + grapheme_width)?;
        }
        self.buffer.mark_views_dirty();
        Ok(())
    }

    // ---- cursor motion ----

    pub fn move_left(&mut self) {
        let (buf, cursor) = self.parts_mut();
        cursor::move_left(buf, cursor);
    }

    pub fn move_right(&mut self) {
        let (buf, cursor) = self.parts_mut();
        cursor::move_right(buf, cursor);
    }

    pub fn move_up(&mut self) {
        let (buf, cursor) = self.parts_mut();
        cursor::move_up(buf, cursor);
    }

    pub fn move_down(&mut self) {
        let (buf, cursor) = self.parts_mut();
        cursor::move_down(buf, cursor);
    }

    pub fn move_to_line_start(&mut self) {
        cursor::move_to_line_start(&mut self.cursors[0]);
    }

    pub fn move_to_line_end(&mut self) {
        let (buf, cursor) = self.parts_mut();
        cursor::move_to_line_end(buf, cursor);
    }

    // ---- whole-buffer convenience ----

    /// Replace the entire content.
    pub fn set_text(&mut self, text: &str) -> Result<(), EditError> {
        self.clear()?;
        self.insert_text(text)
    }

    /// Reset to the empty single-line state. Add-buffers stay registered;
    /// the registry releases them when the buffer drops.
    pub fn clear(&mut self) -> Result<(), EditError> {
        let total = self.buffer.get_total_width();
        self.buffer.delete_weight_range(0, total)?;
        self.cursors.clear();
        self.cursors.push(Cursor::default());
        self.buffer.mark_views_dirty();
        Ok(())
    }
}

impl std::fmt::Debug for EditBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditBuffer")
            .field("buffer", &self.buffer)
            .field("cursors", &self.cursors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(edit: &EditBuffer) -> String {
        let mut out = Vec::new();
        edit.buffer().get_plain_text_into(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn insert_single_line() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("hello").unwrap();
        assert_eq!(edit.buffer().get_line_count(), 1);
        assert_eq!(plain(&edit), "hello");
        let c = edit.get_primary_cursor();
        assert_eq!((c.row, c.col), (0, 5));
    }

    #[test]
    fn insert_in_the_middle() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("held").unwrap();
        edit.set_cursor(0, 3).unwrap();
        edit.insert_text("lo wor").unwrap();
        assert_eq!(plain(&edit), "hello word");
        assert_eq!(edit.get_primary_cursor().col, 9);
    }

    #[test]
    fn insert_splits_wide_content_on_grapheme_boundary() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("漢字").unwrap();
        edit.set_cursor(0, 2).unwrap();
        edit.insert_text("x").unwrap();
        assert_eq!(plain(&edit), "漢x字");
        assert_eq!(edit.buffer().get_total_width(), 5);
    }

    #[test]
    fn delete_range_within_line() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("hello world").unwrap();
        edit.delete_range((0, 5), (0, 11)).unwrap();
        assert_eq!(plain(&edit), "hello");
        assert_eq!(edit.get_primary_cursor().col, 5);
    }

    #[test]
    fn delete_range_across_lines() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("abc\ndef\nghi").unwrap();
        edit.delete_range((0, 2), (2, 1)).unwrap();
        assert_eq!(plain(&edit), "abhi");
        assert_eq!(edit.buffer().get_line_count(), 1);
    }

    #[test]
    fn delete_range_is_order_insensitive() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("abcdef").unwrap();
        edit.delete_range((0, 4), (0, 2)).unwrap();
        assert_eq!(plain(&edit), "abef");
    }

    #[test]
    fn empty_range_delete_is_noop() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("abc").unwrap();
        edit.delete_range((0, 1), (0, 1)).unwrap();
        assert_eq!(plain(&edit), "abc");
    }

    #[test]
    fn backspace_wide_grapheme() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("a漢").unwrap();
        edit.backspace().unwrap();
        assert_eq!(plain(&edit), "a");
        assert_eq!(edit.get_primary_cursor().col, 1);
    }

    #[test]
    fn backspace_at_origin_is_noop() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("ab").unwrap();
        edit.set_cursor(0, 0).unwrap();
        edit.backspace().unwrap();
        assert_eq!(plain(&edit), "ab");
    }

    #[test]
    fn delete_forward_joins_lines() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("ab\ncd").unwrap();
        edit.set_cursor(0, 2).unwrap();
        edit.delete_forward().unwrap();
        assert_eq!(plain(&edit), "abcd");
        let c = edit.get_primary_cursor();
        assert_eq!((c.row, c.col), (0, 2));
        // At the very end nothing happens.
        edit.set_cursor(0, 4).unwrap();
        edit.delete_forward().unwrap();
        assert_eq!(plain(&edit), "abcd");
    }

    #[test]
    fn delete_forward_takes_whole_grapheme() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("漢a").unwrap();
        edit.set_cursor(0, 0).unwrap();
        edit.delete_forward().unwrap();
        assert_eq!(plain(&edit), "a");
    }

    #[test]
    fn add_buffer_rolls_over_on_large_insert() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        let big = "x".repeat(ADD_BUFFER_INITIAL + 10);
        edit.insert_text(&big).unwrap();
        edit.insert_text("y").unwrap();
        assert_eq!(edit.buffer().get_total_width(), big.len() + 1);
    }

    #[test]
    fn set_cursor_rejects_invalid() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("ab").unwrap();
        assert_eq!(edit.set_cursor(0, 3), Err(EditError::InvalidCursor));
        assert_eq!(edit.set_cursor(1, 0), Err(EditError::InvalidCursor));
        assert!(edit.set_cursor(0, 2).is_ok());
    }

    #[test]
    fn set_text_replaces_content() {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text("old\ncontent").unwrap();
        edit.set_text("new").unwrap();
        assert_eq!(plain(&edit), "new");
        assert_eq!(edit.buffer().get_line_count(), 1);
    }
}
