//! Width-driven position fitting.
//!
//! These helpers answer "which byte offset corresponds to display column
//! N" and its inverses, walking grapheme clusters and accumulating cell
//! widths. Offsets returned always sit on grapheme boundaries. ASCII-only
//! text short-circuits to byte arithmetic; a `memchr` probe for tabs keeps
//! the fast path honest.

use crate::width::WidthPolicy;
use unicode_segmentation::UnicodeSegmentation;

/// One decoded grapheme: its byte length and display width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphemeAt {
    pub len: usize,
    pub width: usize,
}

/// Decode the grapheme cluster starting at `offset`.
///
/// Returns `None` when `offset` is at or past the end of the text, or not
/// on a character boundary.
pub fn decode_grapheme_at(text: &str, offset: usize, policy: &WidthPolicy) -> Option<GraphemeAt> {
    if offset >= text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let g = text[offset..].graphemes(true).next()?;
    Some(GraphemeAt {
        len: g.len(),
        width: policy.cluster_width(g),
    })
}

/// Result of a width fit: the boundary found and the columns consumed up
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthFit {
    pub byte_offset: usize,
    pub columns: usize,
}

/// Find the grapheme boundary at or around display column `target_cols`.
///
/// When the target lands inside a cluster, `round_up` snaps to the end of
/// the straddling cluster (`columns >= target`, overshoot bounded by one
/// cluster width); otherwise the fit snaps to its start
/// (`columns <= target`). A target at or past the total width returns the
/// end of the text.
pub fn find_pos_by_width(
    text: &str,
    target_cols: usize,
    ascii_only: bool,
    round_up: bool,
    policy: &WidthPolicy,
) -> WidthFit {
    if ascii_only && memchr::memchr(b'\t', text.as_bytes()).is_none() {
        let off = target_cols.min(text.len());
        return WidthFit {
            byte_offset: off,
            columns: off,
        };
    }
    let mut cols = 0usize;
    for (idx, g) in text.grapheme_indices(true) {
        if cols == target_cols {
            return WidthFit {
                byte_offset: idx,
                columns: cols,
            };
        }
        let w = policy.cluster_width(g);
        if cols + w > target_cols {
            return if round_up {
                WidthFit {
                    byte_offset: idx + g.len(),
                    columns: cols + w,
                }
            } else {
                WidthFit {
                    byte_offset: idx,
                    columns: cols,
                }
            };
        }
        cols += w;
    }
    WidthFit {
        byte_offset: text.len(),
        columns: cols,
    }
}

/// Result of a greedy wrap fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapFit {
    pub graphemes: usize,
    pub byte_offset: usize,
    pub columns: usize,
}

/// Greedily fit whole graphemes into `max_cols` display columns.
///
/// Stops before the first cluster that would overflow. A zero result
/// (`graphemes == 0`) means even the first cluster does not fit; character
/// wrapping uses that signal to commit the current line or force a cluster
/// onto an empty one.
pub fn find_wrap_pos_by_width(
    text: &str,
    max_cols: usize,
    ascii_only: bool,
    policy: &WidthPolicy,
) -> WrapFit {
    if ascii_only && memchr::memchr(b'\t', text.as_bytes()).is_none() {
        let n = max_cols.min(text.len());
        return WrapFit {
            graphemes: n,
            byte_offset: n,
            columns: n,
        };
    }
    let mut fit = WrapFit {
        graphemes: 0,
        byte_offset: 0,
        columns: 0,
    };
    for (idx, g) in text.grapheme_indices(true) {
        let w = policy.cluster_width(g);
        if fit.columns + w > max_cols {
            break;
        }
        fit.graphemes += 1;
        fit.byte_offset = idx + g.len();
        fit.columns += w;
    }
    fit
}

/// The grapheme ending at `before`: start offset and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrevGrapheme {
    pub byte_offset: usize,
    pub width: usize,
}

/// Reverse iteration helper: the cluster immediately before byte `before`.
pub fn prev_grapheme_start(text: &str, before: usize, policy: &WidthPolicy) -> Option<PrevGrapheme> {
    let before = before.min(text.len());
    if before == 0 || !text.is_char_boundary(before) {
        return None;
    }
    let (idx, g) = text[..before].grapheme_indices(true).next_back()?;
    Some(PrevGrapheme {
        byte_offset: idx,
        width: policy.cluster_width(g),
    })
}
