//! Line-oriented traversal and coordinate conversion.
//!
//! Rows and columns here are display coordinates: a row is a `LineStart`
//! ordinal, a column a display-width offset inside that line. Functions
//! taking `&mut Rope` only touch the lazily-built marker cache; they
//! never change content. The shared-reference variants descend the tree
//! instead and stay O(log n) per call.

use crate::chunk::TextChunk;
use crate::rope::{Rope, RopeError};
use crate::segment::Segment;
use core_mem::MemRegistry;
use core_scan::{WidthPolicy, decode_grapheme_at, find_pos_by_width, prev_grapheme_start};

/// One logical line: its ordinal, starting display offset, width, and the
/// segment index range of its text chunks (line-start marker and trailing
/// break excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    pub line_idx: usize,
    pub char_offset: usize,
    pub width: usize,
    pub seg_start: usize,
    pub seg_end: usize,
}

/// Display width of line `row`: the gap to the next line start minus the
/// break column, or the remaining weight for the final line.
pub fn line_width_at(rope: &mut Rope, row: usize) -> Option<usize> {
    let (weight, next) = {
        let markers = rope.markers();
        (
            markers.get(row)?.weight,
            markers.get(row + 1).map(|m| m.weight),
        )
    };
    Some(match next {
        Some(next) => next - weight - 1,
        None => rope.total_weight() - weight,
    })
}

/// `(row, col)` to global display offset. `None` when the row does not
/// exist or the column lies past the line's width (the newline column
/// itself, `col == width`, is addressable).
pub fn coords_to_offset(rope: &mut Rope, row: usize, col: usize) -> Option<usize> {
    let width = line_width_at(rope, row)?;
    if col > width {
        return None;
    }
    Some(rope.get_marker(row)?.weight + col)
}

/// Global display offset to `(row, col)` by binary search over line-start
/// weights. An offset equal to a line-start weight belongs to that line's
/// column 0; the offset one short of it is the previous line's newline
/// column. `None` past `total_weight`.
pub fn offset_to_coords(rope: &mut Rope, offset: usize) -> Option<(usize, usize)> {
    if offset > rope.total_weight() {
        return None;
    }
    let markers = rope.markers();
    if markers.is_empty() {
        return None;
    }
    let row = markers.partition_point(|m| m.weight <= offset) - 1;
    let col = offset - markers[row].weight;
    Some((row, col))
}

/// Emit a [`LineInfo`] per logical line. The callback returns `false` to
/// stop early; the walk reports whether it ran to completion.
pub fn walk_lines(rope: &mut Rope, mut cb: impl FnMut(&LineInfo) -> bool) -> bool {
    let markers = rope.markers().to_vec();
    let total = rope.total_weight();
    let count = rope.count();
    for (row, marker) in markers.iter().enumerate() {
        let (width, seg_end) = match markers.get(row + 1) {
            Some(next) => (next.weight - marker.weight - 1, next.seg_index - 1),
            None => (total - marker.weight, count),
        };
        let info = LineInfo {
            line_idx: row,
            char_offset: marker.weight,
            width,
            seg_start: marker.seg_index + 1,
            seg_end,
        };
        if !cb(&info) {
            return false;
        }
    }
    true
}

/// Single in-order walk dispatching text chunks and line ends.
///
/// For each text segment of line `i`, `seg_cb(i, chunk, chunk_idx_in_line)`
/// fires; at each `Break` — and once more at the end of a non-empty rope —
/// `line_cb` fires with the finished line. Either callback returns `false`
/// to stop.
pub fn walk_lines_and_segments(
    rope: &Rope,
    mut seg_cb: impl FnMut(usize, &TextChunk, usize) -> bool,
    mut line_cb: impl FnMut(&LineInfo) -> bool,
) -> bool {
    if rope.is_empty() {
        return true;
    }
    let mut line_idx = 0usize;
    let mut chunk_idx = 0usize;
    let mut line_offset = 0usize;
    let mut weight = 0usize;
    let mut seg_start = 0usize;
    let completed = rope.walk(|i, seg| match seg {
        Segment::LineStart => {
            seg_start = i + 1;
            line_offset = weight;
            true
        }
        Segment::Text(chunk) => {
            if !seg_cb(line_idx, chunk, chunk_idx) {
                return false;
            }
            chunk_idx += 1;
            weight += chunk.width();
            true
        }
        Segment::Break => {
            let info = LineInfo {
                line_idx,
                char_offset: line_offset,
                width: weight - line_offset,
                seg_start,
                seg_end: i,
            };
            if !line_cb(&info) {
                return false;
            }
            line_idx += 1;
            chunk_idx = 0;
            weight += 1;
            true
        }
    });
    if !completed {
        return false;
    }
    line_cb(&LineInfo {
        line_idx,
        char_offset: line_offset,
        width: weight - line_offset,
        seg_start,
        seg_end: rope.count(),
    })
}

/// Line span `(start_weight, width)` via tree descent only; no cache.
fn line_span(rope: &Rope, row: usize) -> Option<(usize, usize)> {
    let start = rope.locate_marker(row)?;
    let width = match rope.locate_marker(row + 1) {
        Some(next) => next.weight - start.weight - 1,
        None => rope.total_weight() - start.weight,
    };
    Some((start.weight, width))
}

/// Width of the grapheme under `(row, col)`; `None` at or past line end.
pub fn grapheme_width_at(
    rope: &Rope,
    registry: &MemRegistry,
    row: usize,
    col: usize,
    policy: &WidthPolicy,
) -> Option<usize> {
    let (start, width) = line_span(rope, row)?;
    if col >= width {
        return None;
    }
    let (index, within) = rope.locate_weight(start + col).ok()?;
    let chunk = rope.get(index)?.as_chunk()?;
    let text = chunk.text(registry);
    let fit = find_pos_by_width(text, within, chunk.ascii_only(), false, policy);
    decode_grapheme_at(text, fit.byte_offset, policy).map(|g| g.width)
}

/// Width of the grapheme ending at `(row, col)`; `None` at column 0.
pub fn prev_grapheme_width(
    rope: &Rope,
    registry: &MemRegistry,
    row: usize,
    col: usize,
    policy: &WidthPolicy,
) -> Option<usize> {
    let (start, width) = line_span(rope, row)?;
    if col == 0 || col > width {
        return None;
    }
    let (index, within) = rope.locate_weight(start + col - 1).ok()?;
    let chunk = rope.get(index)?.as_chunk()?;
    let text = chunk.text(registry);
    let end = find_pos_by_width(text, within + 1, chunk.ascii_only(), true, policy).byte_offset;
    prev_grapheme_start(text, end, policy).map(|p| p.width)
}

/// Copy the text covering display range `[start, end)` into `out`,
/// returning the bytes written.
///
/// Boundary policy: a grapheme starting strictly before `start` is
/// excluded; a grapheme starting strictly before `end` is included whole.
/// One `\n` is emitted for each `Break` inside the range.
pub fn extract_text_between_offsets(
    rope: &Rope,
    registry: &MemRegistry,
    start: usize,
    end: usize,
    out: &mut Vec<u8>,
    policy: &WidthPolicy,
) -> Result<usize, RopeError> {
    if start > end || end > rope.total_weight() {
        return Err(RopeError::OutOfBounds);
    }
    let before = out.len();
    let mut acc = 0usize;
    rope.walk(|_, seg| {
        if acc >= end {
            return false;
        }
        match seg {
            Segment::LineStart => {}
            Segment::Break => {
                if acc >= start {
                    out.push(b'\n');
                }
                acc += 1;
            }
            Segment::Text(chunk) => {
                let from = acc;
                let to = acc + chunk.width();
                if to > start && from < end && !chunk.is_empty() {
                    let text = chunk.text(registry);
                    let lo = start.saturating_sub(from);
                    let hi = (end - from).min(chunk.width());
                    let sb = find_pos_by_width(text, lo, chunk.ascii_only(), true, policy);
                    let eb = find_pos_by_width(text, hi, chunk.ascii_only(), true, policy);
                    if eb.byte_offset > sb.byte_offset {
                        out.extend_from_slice(&text.as_bytes()[sb.byte_offset..eb.byte_offset]);
                    }
                }
                acc = to;
            }
        }
        true
    });
    Ok(out.len() - before)
}
