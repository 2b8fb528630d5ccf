//! Immutable text chunks.
//!
//! A chunk is a view over a registered memory buffer: `(mem_id, byte
//! range)` plus a precomputed display width. Chunks never own bytes and
//! never change after construction; edits replace chunks rather than
//! mutating them. The wrap-offset index is the one lazily-computed field,
//! memoized per chunk and implicitly discarded when a split mints new
//! chunks.

use bitflags::bitflags;
use core_mem::{MemId, MemRegistry};
use core_scan::{WidthPolicy, is_wrap_break};
use std::cell::OnceCell;
use unicode_segmentation::UnicodeSegmentation;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChunkFlags: u8 {
        /// Every byte is < 0x80: byte arithmetic equals column arithmetic
        /// (tabs excepted; the fitting functions probe for them).
        const ASCII_ONLY = 1 << 0;
    }
}

/// A soft-wrap opportunity inside a chunk: the byte and column offsets
/// just past the breaking grapheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapOffset {
    pub byte_end: usize,
    pub col_end: usize,
}

/// Immutable view over registered bytes with a precomputed display width.
#[derive(Debug, Clone)]
pub struct TextChunk {
    mem_id: MemId,
    byte_start: usize,
    byte_end: usize,
    width: usize,
    flags: ChunkFlags,
    wrap_offsets: OnceCell<Box<[WrapOffset]>>,
}

impl TextChunk {
    /// Build a chunk over `registry[mem_id][byte_start..byte_end]`.
    ///
    /// The caller vouches that the range is valid UTF-8 sitting on
    /// grapheme boundaries and that `width` is the policy's width of that
    /// text; buffer-level constructors compute both.
    pub fn new(
        mem_id: MemId,
        byte_start: usize,
        byte_end: usize,
        width: usize,
        ascii_only: bool,
    ) -> Self {
        let flags = if ascii_only {
            ChunkFlags::ASCII_ONLY
        } else {
            ChunkFlags::empty()
        };
        Self {
            mem_id,
            byte_start,
            byte_end,
            width,
            flags,
            wrap_offsets: OnceCell::new(),
        }
    }

    pub fn mem_id(&self) -> MemId {
        self.mem_id
    }

    pub fn byte_start(&self) -> usize {
        self.byte_start
    }

    pub fn byte_end(&self) -> usize {
        self.byte_end
    }

    pub fn byte_len(&self) -> usize {
        self.byte_end - self.byte_start
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.byte_start == self.byte_end
    }

    pub fn ascii_only(&self) -> bool {
        self.flags.contains(ChunkFlags::ASCII_ONLY)
    }

    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    /// The chunk's text. Registered chunk ranges are validated UTF-8 at
    /// creation; a stale or corrupted id degrades to the empty string
    /// rather than panicking.
    pub fn text<'a>(&self, registry: &'a MemRegistry) -> &'a str {
        registry
            .get(self.mem_id)
            .and_then(|bytes| bytes.get(self.byte_start..self.byte_end))
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or_default()
    }

    /// Sorted soft-wrap opportunities within this chunk, memoized on
    /// first use.
    pub fn wrap_offsets(&self, registry: &MemRegistry, policy: &WidthPolicy) -> &[WrapOffset] {
        self.wrap_offsets.get_or_init(|| {
            let text = self.text(registry);
            let mut out = Vec::new();
            let mut col = 0usize;
            for (idx, g) in text.grapheme_indices(true) {
                col += policy.cluster_width(g);
                if is_wrap_break(g) {
                    out.push(WrapOffset {
                        byte_end: idx + g.len(),
                        col_end: col,
                    });
                }
            }
            out.into_boxed_slice()
        })
    }
}
