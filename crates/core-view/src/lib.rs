//! Per-view projection of a buffer into wrapped virtual lines.
//!
//! A view owns no text: it holds wrap parameters, a selection, and a
//! projection arena that is cleared and rebuilt whenever the buffer (or
//! the view's own configuration) is dirty. Virtual lines index fragments
//! in the arena, and fragments address graphemes inside the source line's
//! chunks, so hosts can paint without re-walking the rope.
//!
//! Views and buffers are linked by id, not pointer: the buffer keeps a
//! dirty bit per registered view, and the view receives the buffer
//! explicitly at projection time.

mod wrap;

use core_edit::{TextBuffer, ViewId};
use tracing::trace;
use wrap::Projector;

/// How a view breaks logical lines at the wrap width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Char,
    Word,
}

/// A fragment of one source chunk on a virtual line.
///
/// `chunk_index` is the text-chunk ordinal within the source logical
/// line; `grapheme_start`/`grapheme_count` and the byte range address the
/// fragment inside that chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualChunk {
    pub chunk_index: usize,
    pub byte_start: usize,
    pub byte_len: usize,
    pub grapheme_start: usize,
    pub grapheme_count: usize,
    pub width: usize,
}

/// One display row of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualLine {
    /// Fragment range in the view's arena.
    pub chunk_start: usize,
    pub chunk_end: usize,
    pub width: usize,
    /// Global display offset of the first column.
    pub char_offset: usize,
    pub source_line: usize,
    /// Column offset inside the source logical line.
    pub source_col_offset: usize,
}

/// Packed RGBA color for selection painting.
pub type Rgba = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Global display offsets, normalized so `start <= end`.
    pub start: usize,
    pub end: usize,
    pub bg: Option<Rgba>,
    pub fg: Option<Rgba>,
}

/// Cached per-projection line table.
#[derive(Debug, Clone, Copy)]
pub struct CachedLineInfo<'a> {
    pub line_starts: &'a [usize],
    pub line_widths: &'a [usize],
    pub max_width: usize,
}

/// A wrapped, virtualized projection of one buffer.
#[derive(Debug)]
pub struct View {
    id: ViewId,
    wrap_width: Option<usize>,
    wrap_mode: WrapMode,
    dirty: bool,
    arena: Vec<VirtualChunk>,
    lines: Vec<VirtualLine>,
    cached_line_starts: Vec<usize>,
    cached_line_widths: Vec<usize>,
    cached_max_width: usize,
    selection: Option<Selection>,
}

impl View {
    /// Register a new view on `buffer`. The view starts dirty.
    pub fn new(buffer: &mut TextBuffer) -> Self {
        Self {
            id: buffer.register_view(),
            wrap_width: None,
            wrap_mode: WrapMode::default(),
            dirty: true,
            arena: Vec::new(),
            lines: Vec::new(),
            cached_line_starts: Vec::new(),
            cached_line_widths: Vec::new(),
            cached_max_width: 0,
            selection: None,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Unregister from the buffer. The view keeps its last projection but
    /// will no longer be tracked for dirtiness.
    pub fn close(&self, buffer: &mut TextBuffer) {
        buffer.unregister_view(self.id);
    }

    pub fn wrap_width(&self) -> Option<usize> {
        self.wrap_width
    }

    /// Change the wrap width; setting the same value is a no-op.
    pub fn set_wrap_width(&mut self, width: Option<usize>) {
        if self.wrap_width != width {
            self.wrap_width = width;
            self.dirty = true;
        }
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        if self.wrap_mode != mode {
            self.wrap_mode = mode;
            self.dirty = true;
        }
    }

    // ---- selection ----

    /// Set the selection over a global display-offset range, with the
    /// colors the host paints it in.
    pub fn set_selection(&mut self, start: usize, end: usize, bg: Option<Rgba>, fg: Option<Rgba>) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.selection = Some(Selection { start, end, bg, fg });
    }

    pub fn reset_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Extract the selected text into `out`; 0 bytes when nothing is
    /// selected.
    pub fn selected_text_into(&self, buffer: &TextBuffer, out: &mut Vec<u8>) -> usize {
        match self.selection {
            Some(sel) => {
                let end = sel.end.min(buffer.get_total_width());
                let start = sel.start.min(end);
                buffer.extract_into(start, end, out).unwrap_or(0)
            }
            None => 0,
        }
    }

    // ---- projection ----

    /// Rebuild virtual lines if this view or its buffer is dirty.
    ///
    /// Must not run concurrently with mutation on the buffer; the
    /// `&mut TextBuffer` requirement enforces that per Rust aliasing.
    pub fn update_virtual_lines(&mut self, buffer: &mut TextBuffer) {
        if !self.dirty && !buffer.is_view_dirty(self.id) {
            return;
        }
        let mut arena = std::mem::take(&mut self.arena);
        let mut lines = std::mem::take(&mut self.lines);
        arena.clear();
        lines.clear();
        let policy = buffer.policy();
        let projector = Projector::new(
            buffer.registry(),
            policy,
            self.wrap_width,
            self.wrap_mode,
            arena,
            lines,
        );
        let (arena, lines) = projector.run(buffer.rope());
        self.arena = arena;
        self.lines = lines;

        self.cached_line_starts.clear();
        self.cached_line_widths.clear();
        self.cached_max_width = 0;
        for line in &self.lines {
            self.cached_line_starts.push(line.char_offset);
            self.cached_line_widths.push(line.width);
            self.cached_max_width = self.cached_max_width.max(line.width);
        }

        self.dirty = false;
        buffer.clear_view_dirty(self.id);
        trace!(
            lines = self.lines.len(),
            wrap = ?self.wrap_width,
            "virtual lines rebuilt"
        );
    }

    pub fn get_virtual_line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn get_virtual_lines(&self) -> &[VirtualLine] {
        &self.lines
    }

    /// Fragments of one virtual line.
    pub fn chunks_of(&self, line: &VirtualLine) -> &[VirtualChunk] {
        &self.arena[line.chunk_start..line.chunk_end]
    }

    pub fn get_cached_line_info(&self) -> CachedLineInfo<'_> {
        CachedLineInfo {
            line_starts: &self.cached_line_starts,
            line_widths: &self.cached_line_widths,
            max_width: self.cached_max_width,
        }
    }

    /// Materialize the text of virtual line `index`.
    pub fn line_text(&self, buffer: &TextBuffer, index: usize) -> Option<String> {
        let line = self.lines.get(index)?;
        let mut out = Vec::new();
        buffer
            .extract_into(line.char_offset, line.char_offset + line.width, &mut out)
            .ok()?;
        String::from_utf8(out).ok()
    }
}
