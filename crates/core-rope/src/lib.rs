//! Segmented rope: display-width addressed storage for editable text.
//!
//! The rope stores a flat sequence of [`Segment`]s (text chunks, hard
//! breaks, line-start markers) in a measured B-tree. Geometry queries —
//! line count, total width, widest line, marker positions — read
//! aggregated metrics instead of scanning text, and the weight-addressed
//! edit operations split straddled chunks through a caller-supplied
//! [`SegmentSplit`].
//!
//! Chunks reference bytes by registry id ([`core_mem::MemRegistry`]); the
//! rope itself never owns text.

pub mod chunk;
pub mod iter;
pub mod rope;
pub mod segment;

pub use chunk::{ChunkFlags, TextChunk, WrapOffset};
pub use iter::{
    LineInfo, coords_to_offset, extract_text_between_offsets, grapheme_width_at, line_width_at,
    offset_to_coords, prev_grapheme_width, walk_lines, walk_lines_and_segments,
};
pub use rope::{MarkerPos, Rope, RopeError, SegmentSplit};
pub use segment::{Measure, Segment};
