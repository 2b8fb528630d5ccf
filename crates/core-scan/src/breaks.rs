//! Newline and soft-wrap break scanning.
//!
//! `find_line_breaks` is the hard-break scan used when text enters the
//! buffer; it runs on raw bytes via `memchr` so large pastes stay cheap.
//! `is_wrap_break`/`find_wrap_breaks` classify the grapheme positions at
//! which a soft line break is permitted, used by word wrapping.

use memchr::memchr2_iter;
use unicode_segmentation::UnicodeSegmentation;

/// Kind of hard line break found in input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreakKind {
    Lf,
    Cr,
    CrLf,
}

/// A hard line break at byte position `pos`.
///
/// For `CrLf` the position is that of the LF; the CR sits at `pos - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBreak {
    pub pos: usize,
    pub kind: LineBreakKind,
}

/// Scan `bytes` for LF, CR and CRLF breaks in order.
///
/// A CR directly followed by an LF is reported once as `CrLf`, even when
/// the pair straddles the underlying scanner's internal window boundary
/// (memchr yields a single position stream, so pairing is positional, not
/// window-local).
pub fn find_line_breaks(bytes: &[u8]) -> Vec<LineBreak> {
    let mut out = Vec::new();
    let mut skip_lf_at = usize::MAX;
    for pos in memchr2_iter(b'\r', b'\n', bytes) {
        match bytes[pos] {
            b'\n' => {
                if pos == skip_lf_at {
                    continue;
                }
                out.push(LineBreak {
                    pos,
                    kind: LineBreakKind::Lf,
                });
            }
            _ => {
                if bytes.get(pos + 1) == Some(&b'\n') {
                    out.push(LineBreak {
                        pos: pos + 1,
                        kind: LineBreakKind::CrLf,
                    });
                    skip_lf_at = pos + 1;
                } else {
                    out.push(LineBreak {
                        pos,
                        kind: LineBreakKind::Cr,
                    });
                }
            }
        }
    }
    out
}

const ASCII_BREAKS: &[u8] = b" \t-/\\.,;:!?()[]{}";

/// True if a soft wrap is permitted after this grapheme cluster.
pub fn is_wrap_break(cluster: &str) -> bool {
    let mut chars = cluster.chars();
    let Some(c) = chars.next() else {
        return false;
    };
    if chars.next().is_some() {
        // Multi-scalar clusters (emoji, combining sequences) never break.
        return false;
    }
    if c.is_ascii() {
        return ASCII_BREAKS.contains(&(c as u8));
    }
    matches!(
        c,
        '\u{00A0}'          // no-break space
        | '\u{00AD}'        // soft hyphen
        | '\u{1680}'        // ogham space mark
        | '\u{2000}'..='\u{200A}'
        | '\u{200B}'        // zero-width space
        | '\u{2010}'        // hyphen
        | '\u{202F}'
        | '\u{205F}'
        | '\u{3000}'        // ideographic space
    )
}

/// Byte offsets *after* which a soft wrap is permitted.
///
/// Each returned offset is the end of a breaking grapheme, so a line may
/// be cut at that offset with the break character kept on the left side.
pub fn find_wrap_breaks(text: &str) -> Vec<usize> {
    if text.is_ascii() {
        return text
            .bytes()
            .enumerate()
            .filter(|(_, b)| ASCII_BREAKS.contains(b))
            .map(|(i, _)| i + 1)
            .collect();
    }
    text.grapheme_indices(true)
        .filter(|(_, g)| is_wrap_break(g))
        .map(|(i, g)| i + g.len())
        .collect()
}
