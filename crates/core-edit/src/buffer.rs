//! Buffer state: registry + rope + views.
//!
//! The buffer is the owner that makes chunk ids safe: chunks reference
//! registry slots, and both live and die together here. Geometric queries
//! read the rope's aggregated metrics in O(1). Views register for a
//! monotonic id and a dirty bit; every mutation sets all dirty bits
//! before returning, so a view's next projection observes the new state.

use crate::EditError;
use ahash::AHashMap;
use core_mem::{MemBytes, MemId, MemRegistry};
use core_rope::{
    Rope, Segment, SegmentSplit, TextChunk, coords_to_offset, extract_text_between_offsets,
    line_width_at, offset_to_coords,
};
use core_scan::{
    DefaultWidthOracle, WidthMethod, WidthOracle, WidthPolicy, find_pos_by_width, is_ascii_only,
};

/// Per-view handle issued by [`TextBuffer::register_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u32);

/// Construction-time configuration.
#[derive(Debug, Clone, Copy)]
pub struct BufferOptions {
    pub tab_width: usize,
    pub width_method: WidthMethod,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            width_method: WidthMethod::Unicode,
        }
    }
}

/// Owns registry, rope, width oracle and view bookkeeping.
pub struct TextBuffer {
    registry: MemRegistry,
    rope: Rope,
    oracle: Box<dyn WidthOracle>,
    options: BufferOptions,
    next_view_id: u32,
    dirty: AHashMap<ViewId, bool>,
}

impl TextBuffer {
    /// Empty buffer: one `LineStart` and an empty text chunk.
    pub fn new(oracle: Box<dyn WidthOracle>, options: BufferOptions) -> Result<Self, EditError> {
        let mut registry = MemRegistry::new();
        let empty = registry.register(MemBytes::Static(b""))?;
        let mut rope = Rope::new();
        rope.append(Segment::LineStart);
        rope.append(Segment::Text(TextChunk::new(empty, 0, 0, 0, true)));
        Ok(Self {
            registry,
            rope,
            oracle,
            options,
            next_view_id: 0,
            dirty: AHashMap::new(),
        })
    }

    pub fn with_defaults() -> Result<Self, EditError> {
        Self::new(Box::new(DefaultWidthOracle), BufferOptions::default())
    }

    pub fn options(&self) -> BufferOptions {
        self.options
    }

    /// Width policy bundling the injected oracle with the buffer options.
    pub fn policy(&self) -> WidthPolicy<'_> {
        WidthPolicy::new(
            self.oracle.as_ref(),
            self.options.width_method,
            self.options.tab_width,
        )
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub(crate) fn rope_mut(&mut self) -> &mut Rope {
        &mut self.rope
    }

    pub fn registry(&self) -> &MemRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut MemRegistry {
        &mut self.registry
    }

    /// Register raw bytes with the underlying registry.
    pub fn register_mem_buffer(&mut self, bytes: MemBytes) -> Result<MemId, EditError> {
        Ok(self.registry.register(bytes)?)
    }

    /// Build a chunk over a registered range, computing its display width
    /// and ASCII flag. The range must be valid UTF-8 on grapheme
    /// boundaries.
    pub fn create_chunk(
        &self,
        mem_id: MemId,
        byte_start: usize,
        byte_end: usize,
    ) -> Result<TextChunk, EditError> {
        let bytes = self
            .registry
            .get(mem_id)
            .ok_or(core_mem::MemError::InvalidMemId)?;
        let slice = bytes
            .get(byte_start..byte_end)
            .ok_or(core_rope::RopeError::OutOfBounds)?;
        let text =
            std::str::from_utf8(slice).map_err(|_| core_rope::RopeError::OutOfBounds)?;
        let width = self.policy().text_width(text);
        Ok(TextChunk::new(
            mem_id,
            byte_start,
            byte_end,
            width,
            is_ascii_only(text),
        ))
    }

    // ---- view bookkeeping ----

    pub fn register_view(&mut self) -> ViewId {
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.dirty.insert(id, true);
        id
    }

    pub fn unregister_view(&mut self, id: ViewId) {
        self.dirty.remove(&id);
    }

    pub fn mark_views_dirty(&mut self) {
        for flag in self.dirty.values_mut() {
            *flag = true;
        }
    }

    pub fn is_view_dirty(&self, id: ViewId) -> bool {
        self.dirty.get(&id).copied().unwrap_or(false)
    }

    pub fn clear_view_dirty(&mut self, id: ViewId) {
        if let Some(flag) = self.dirty.get_mut(&id) {
            *flag = false;
        }
    }

    // ---- aggregated metrics, O(1) off the root measure ----

    pub fn get_line_count(&self) -> usize {
        self.rope.marker_count()
    }

    pub fn get_total_width(&self) -> usize {
        self.rope.total_weight()
    }

    pub fn get_max_line_width(&self) -> usize {
        self.rope.measure().max_line_width()
    }

    pub fn line_width(&mut self, row: usize) -> Option<usize> {
        line_width_at(&mut self.rope, row)
    }

    pub fn coords_to_offset(&mut self, row: usize, col: usize) -> Option<usize> {
        coords_to_offset(&mut self.rope, row, col)
    }

    pub fn offset_to_coords(&mut self, offset: usize) -> Option<(usize, usize)> {
        offset_to_coords(&mut self.rope, offset)
    }

    // ---- text extraction ----

    /// Flatten the whole buffer into `out` with one `\n` between lines.
    pub fn get_plain_text_into(&self, out: &mut Vec<u8>) -> usize {
        let policy = self.policy();
        extract_text_between_offsets(
            &self.rope,
            &self.registry,
            0,
            self.rope.total_weight(),
            out,
            &policy,
        )
        .unwrap_or(0)
    }

    /// Text of display range `[start, end)`.
    pub fn extract_into(
        &self,
        start: usize,
        end: usize,
        out: &mut Vec<u8>,
    ) -> Result<usize, EditError> {
        let policy = self.policy();
        Ok(extract_text_between_offsets(
            &self.rope,
            &self.registry,
            start,
            end,
            out,
            &policy,
        )?)
    }

    /// One line's text as an owned string.
    pub fn line_text(&mut self, row: usize) -> Option<String> {
        let start = self.coords_to_offset(row, 0)?;
        let width = self.line_width(row)?;
        let mut out = Vec::new();
        self.extract_into(start, start + width, &mut out).ok()?;
        String::from_utf8(out).ok()
    }

    // ---- weight-addressed mutation (splitter wired in) ----

    pub(crate) fn insert_slice_at(
        &mut self,
        offset: usize,
        segs: Vec<Segment>,
    ) -> Result<(), EditError> {
        let splitter = ChunkSplitter {
            registry: &self.registry,
            oracle: self.oracle.as_ref(),
            options: self.options,
        };
        self.rope.insert_slice_by_weight(offset, segs, &splitter)?;
        Ok(())
    }

    pub(crate) fn delete_weight_range(&mut self, start: usize, end: usize) -> Result<(), EditError> {
        let splitter = ChunkSplitter {
            registry: &self.registry,
            oracle: self.oracle.as_ref(),
            options: self.options,
        };
        self.rope.delete_range_by_weight(start, end, &splitter)?;
        Ok(())
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("lines", &self.get_line_count())
            .field("total_width", &self.get_total_width())
            .field("views", &self.dirty.len())
            .finish_non_exhaustive()
    }
}

/// Splits text chunks on grapheme boundaries, snapping a width that lands
/// inside a cluster down to the cluster's start.
struct ChunkSplitter<'a> {
    registry: &'a MemRegistry,
    oracle: &'a dyn WidthOracle,
    options: BufferOptions,
}

impl SegmentSplit for ChunkSplitter<'_> {
    fn split(
        &self,
        chunk: &TextChunk,
        width: usize,
    ) -> Result<(TextChunk, TextChunk), core_rope::RopeError> {
        if width == 0 || width >= chunk.width() {
            return Err(core_rope::RopeError::InvalidSplit);
        }
        let policy = WidthPolicy::new(
            self.oracle,
            self.options.width_method,
            self.options.tab_width,
        );
        let text = chunk.text(self.registry);
        let fit = find_pos_by_width(text, width, chunk.ascii_only(), false, &policy);
        if fit.byte_offset == 0 || fit.byte_offset >= text.len() {
            return Err(core_rope::RopeError::InvalidSplit);
        }
        let (left_text, right_text) = text.split_at(fit.byte_offset);
        let left = TextChunk::new(
            chunk.mem_id(),
            chunk.byte_start(),
            chunk.byte_start() + fit.byte_offset,
            fit.columns,
            is_ascii_only(left_text),
        );
        let right = TextChunk::new(
            chunk.mem_id(),
            chunk.byte_start() + fit.byte_offset,
            chunk.byte_end(),
            chunk.width() - fit.columns,
            is_ascii_only(right_text),
        );
        Ok((left, right))
    }
}
