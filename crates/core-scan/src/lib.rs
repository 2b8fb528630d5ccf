//! Grapheme and width scanning primitives.
//!
//! Pure functions over UTF-8 text: newline scanning, soft-wrap break
//! detection, grapheme decoding, and width-driven position fitting. Nothing
//! here allocates except the output collections, and nothing here touches
//! buffer state; callers hand in the text slice and a [`WidthPolicy`]
//! describing how display columns are assigned.
//!
//! Contract:
//! - All returned byte offsets lie on UTF-8 and grapheme cluster boundaries.
//! - Width decisions flow through the injected [`WidthOracle`]; no caller
//!   consults `unicode-width` directly.

pub mod breaks;
pub mod fit;
pub mod width;

pub use breaks::{LineBreak, LineBreakKind, find_line_breaks, find_wrap_breaks, is_wrap_break};
pub use fit::{
    GraphemeAt, PrevGrapheme, WidthFit, WrapFit, decode_grapheme_at, find_pos_by_width,
    find_wrap_pos_by_width, prev_grapheme_start,
};
pub use width::{DefaultWidthOracle, WidthMethod, WidthOracle, WidthPolicy};

/// True if every byte of `text` is < 0x80.
///
/// Chunk creation uses this to set the ASCII fast-path flag; the fitting
/// functions take the cached answer so they never rescan.
pub fn is_ascii_only(text: &str) -> bool {
    text.is_ascii()
}
