//! Cursor state and motion.
//!
//! Columns are display columns, always sitting on grapheme boundaries.
//! `desired_col` is the sticky column: horizontal motion pins it to the
//! real column, vertical motion keeps it and clamps the real column to
//! each line's width, so walking through a short line and back restores
//! the original column.

use crate::buffer::TextBuffer;
use core_rope::{grapheme_width_at, prev_grapheme_width};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub desired_col: usize,
}

impl Cursor {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            desired_col: col,
        }
    }
}

/// Move one grapheme left, wrapping to the previous line end at column 0.
pub fn move_left(buf: &mut TextBuffer, cursor: &mut Cursor) {
    if cursor.col > 0 {
        let policy = buf.policy();
        let w = prev_grapheme_width(buf.rope(), buf.registry(), cursor.row, cursor.col, &policy)
            .unwrap_or(1);
        cursor.col -= w.min(cursor.col);
    } else if cursor.row > 0 {
        cursor.row -= 1;
        cursor.col = buf.line_width(cursor.row).unwrap_or(0);
    }
    cursor.desired_col = cursor.col;
}

/// Move one grapheme right, wrapping to the next line start at line end.
pub fn move_right(buf: &mut TextBuffer, cursor: &mut Cursor) {
    let width = buf.line_width(cursor.row).unwrap_or(0);
    if cursor.col < width {
        let policy = buf.policy();
        let w = grapheme_width_at(buf.rope(), buf.registry(), cursor.row, cursor.col, &policy)
            .unwrap_or(1);
        cursor.col = (cursor.col + w).min(width);
    } else if cursor.row + 1 < buf.get_line_count() {
        cursor.row += 1;
        cursor.col = 0;
    }
    cursor.desired_col = cursor.col;
}

/// Move up one line, clamping to the target width but keeping the sticky
/// column for later vertical motion.
pub fn move_up(buf: &mut TextBuffer, cursor: &mut Cursor) {
    if cursor.row == 0 {
        return;
    }
    cursor.row -= 1;
    let width = buf.line_width(cursor.row).unwrap_or(0);
    cursor.col = cursor.desired_col.min(width);
}

/// Move down one line; same sticky-column rule as [`move_up`].
pub fn move_down(buf: &mut TextBuffer, cursor: &mut Cursor) {
    if cursor.row + 1 >= buf.get_line_count() {
        return;
    }
    cursor.row += 1;
    let width = buf.line_width(cursor.row).unwrap_or(0);
    cursor.col = cursor.desired_col.min(width);
}

/// Jump to column 0.
pub fn move_to_line_start(cursor: &mut Cursor) {
    cursor.col = 0;
    cursor.desired_col = 0;
}

/// Jump past the last grapheme of the line.
pub fn move_to_line_end(buf: &mut TextBuffer, cursor: &mut Cursor) {
    cursor.col = buf.line_width(cursor.row).unwrap_or(0);
    cursor.desired_col = cursor.col;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditBuffer;

    fn edit_with(text: &str) -> EditBuffer {
        let mut edit = EditBuffer::with_defaults().unwrap();
        edit.insert_text(text).unwrap();
        edit
    }

    #[test]
    fn left_right_cross_lines() {
        let mut edit = edit_with("ab\ncd");
        edit.set_cursor(1, 0).unwrap();
        let (buf, cursor) = edit.parts_mut();
        move_left(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (0, 2));
        move_right(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (1, 0));
    }

    #[test]
    fn right_steps_wide_graphemes() {
        let mut edit = edit_with("a漢b");
        edit.set_cursor(0, 0).unwrap();
        let (buf, cursor) = edit.parts_mut();
        move_right(buf, cursor);
        assert_eq!(cursor.col, 1);
        move_right(buf, cursor);
        assert_eq!(cursor.col, 3, "wide cluster is one step");
        move_left(buf, cursor);
        assert_eq!(cursor.col, 1);
    }

    #[test]
    fn vertical_motion_is_sticky() {
        let mut edit = edit_with("short\nlonger line\nx");
        edit.set_cursor(1, 8).unwrap();
        let (buf, cursor) = edit.parts_mut();
        move_down(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (2, 1));
        assert_eq!(cursor.desired_col, 8);
        move_up(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (1, 8));
        move_up(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (0, 5));
        // At the top: clamped in place, stickiness intact.
        move_up(buf, cursor);
        assert_eq!((cursor.row, cursor.col), (0, 5));
        assert_eq!(cursor.desired_col, 8);
        // Horizontal motion resets the sticky column.
        move_left(buf, cursor);
        assert_eq!(cursor.desired_col, cursor.col);
    }

    #[test]
    fn line_start_end_jumps() {
        let mut edit = edit_with("hello");
        edit.set_cursor(0, 3).unwrap();
        let (buf, cursor) = edit.parts_mut();
        move_to_line_end(buf, cursor);
        assert_eq!(cursor.col, 5);
        move_to_line_start(cursor);
        assert_eq!(cursor.col, 0);
    }
}
