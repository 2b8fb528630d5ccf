//! Wrapped projection of logical lines into virtual lines.
//!
//! The projector walks the rope once in segment order, packing chunk
//! fragments into virtual lines under the wrap width. Character mode fits
//! greedily by cluster; word mode fits the largest prefix ending at a
//! soft-break point, falling back to character fitting for tokens wider
//! than a whole line. Everything lands in the caller's arena vectors;
//! the projector never allocates per line.

use crate::{VirtualChunk, VirtualLine, WrapMode};
use core_mem::MemRegistry;
use core_rope::{Rope, Segment, TextChunk};
use core_scan::{WidthPolicy, decode_grapheme_at, find_wrap_pos_by_width};
use unicode_segmentation::UnicodeSegmentation;

pub(crate) struct Projector<'a> {
    registry: &'a MemRegistry,
    policy: WidthPolicy<'a>,
    wrap_width: Option<usize>,
    mode: WrapMode,
    pub(crate) arena: Vec<VirtualChunk>,
    pub(crate) lines: Vec<VirtualLine>,
    // running state
    global_offset: usize,
    source_line: usize,
    source_col: usize,
    line_position: usize,
    vline_chunk_start: usize,
    chunk_in_line: usize,
    saw_line: bool,
}

impl<'a> Projector<'a> {
    pub(crate) fn new(
        registry: &'a MemRegistry,
        policy: WidthPolicy<'a>,
        wrap_width: Option<usize>,
        mode: WrapMode,
        arena: Vec<VirtualChunk>,
        lines: Vec<VirtualLine>,
    ) -> Self {
        Self {
            registry,
            policy,
            wrap_width,
            mode,
            arena,
            lines,
            global_offset: 0,
            source_line: 0,
            source_col: 0,
            line_position: 0,
            vline_chunk_start: 0,
            chunk_in_line: 0,
            saw_line: false,
        }
    }

    pub(crate) fn run(mut self, rope: &Rope) -> (Vec<VirtualChunk>, Vec<VirtualLine>) {
        rope.walk(|_, seg| {
            match seg {
                Segment::LineStart => self.saw_line = true,
                Segment::Text(chunk) => self.on_chunk(chunk),
                Segment::Break => self.on_break(),
            }
            true
        });
        if self.saw_line {
            self.commit_line();
        }
        (self.arena, self.lines)
    }

    /// Close the pending virtual line, empty or not.
    fn commit_line(&mut self) {
        self.lines.push(VirtualLine {
            chunk_start: self.vline_chunk_start,
            chunk_end: self.arena.len(),
            width: self.line_position,
            char_offset: self.global_offset,
            source_line: self.source_line,
            source_col_offset: self.source_col,
        });
        self.global_offset += self.line_position;
        self.source_col += self.line_position;
        self.line_position = 0;
        self.vline_chunk_start = self.arena.len();
    }

    fn on_break(&mut self) {
        self.commit_line();
        self.global_offset += 1; // the Break column
        self.source_line += 1;
        self.source_col = 0;
        self.chunk_in_line = 0;
    }

    fn on_chunk(&mut self, chunk: &TextChunk) {
        let chunk_index = self.chunk_in_line;
        self.chunk_in_line += 1;
        match self.wrap_width {
            None => self.emit_whole(chunk, chunk_index),
            Some(width) => match self.mode {
                WrapMode::Char => self.fit_chars(chunk, chunk_index, width.max(1)),
                WrapMode::Word => self.fit_words(chunk, chunk_index, width.max(1)),
            },
        }
    }

    fn push_fragment(
        &mut self,
        chunk_index: usize,
        byte_start: usize,
        byte_len: usize,
        grapheme_start: usize,
        grapheme_count: usize,
        width: usize,
    ) {
        self.arena.push(VirtualChunk {
            chunk_index,
            byte_start,
            byte_len,
            grapheme_start,
            grapheme_count,
            width,
        });
        self.line_position += width;
    }

    /// Unwrapped projection: the whole chunk is one fragment.
    fn emit_whole(&mut self, chunk: &TextChunk, chunk_index: usize) {
        if chunk.is_empty() {
            return;
        }
        let text = chunk.text(self.registry);
        let graphemes = text.graphemes(true).count();
        self.push_fragment(chunk_index, 0, text.len(), 0, graphemes, chunk.width());
    }

    /// Greedy character fitting.
    fn fit_chars(&mut self, chunk: &TextChunk, chunk_index: usize, wrap_width: usize) {
        let text = chunk.text(self.registry);
        let mut byte = 0usize;
        let mut grapheme = 0usize;
        while byte < text.len() {
            let avail = wrap_width.saturating_sub(self.line_position);
            let fit =
                find_wrap_pos_by_width(&text[byte..], avail, chunk.ascii_only(), &self.policy);
            if fit.graphemes == 0 {
                if self.line_position > 0 {
                    self.commit_line();
                    continue;
                }
                // A cluster wider than the whole line still gets a cell.
                let Some(g) = decode_grapheme_at(text, byte, &self.policy) else {
                    return;
                };
                self.push_fragment(chunk_index, byte, g.len, grapheme, 1, g.width);
                byte += g.len;
                grapheme += 1;
            } else {
                self.push_fragment(
                    chunk_index,
                    byte,
                    fit.byte_offset,
                    grapheme,
                    fit.graphemes,
                    fit.columns,
                );
                byte += fit.byte_offset;
                grapheme += fit.graphemes;
            }
            if self.line_position >= wrap_width && byte < text.len() {
                self.commit_line();
            }
        }
    }

    /// Word fitting over the chunk's soft-break index, with a character
    /// fallback for tokens wider than a fresh line.
    fn fit_words(&mut self, chunk: &TextChunk, chunk_index: usize, wrap_width: usize) {
        let text = chunk.text(self.registry);
        let offsets = chunk.wrap_offsets(self.registry, &self.policy);
        let mut byte = 0usize;
        let mut col = 0usize;
        let mut grapheme = 0usize;
        while col < chunk.width() {
            let avail = wrap_width.saturating_sub(self.line_position);
            let remaining = chunk.width() - col;
            if remaining <= avail {
                let piece = &text[byte..];
                let count = piece.graphemes(true).count();
                self.push_fragment(chunk_index, byte, piece.len(), grapheme, count, remaining);
                return;
            }
            // Largest prefix ending at a break point that still fits.
            let candidate = offsets
                .iter()
                .filter(|o| o.byte_end > byte && o.col_end > col && o.col_end - col <= avail)
                .next_back()
                .copied();
            match candidate {
                Some(brk) => {
                    let piece = &text[byte..brk.byte_end];
                    let count = piece.graphemes(true).count();
                    let width = brk.col_end - col;
                    self.push_fragment(chunk_index, byte, piece.len(), grapheme, count, width);
                    byte = brk.byte_end;
                    col = brk.col_end;
                    grapheme += count;
                    self.commit_line();
                }
                None if self.line_position > 0 => {
                    // Maybe a break fits on a fresh line.
                    self.commit_line();
                }
                None => {
                    // Token wider than the line: force-break by character.
                    let fit = find_wrap_pos_by_width(
                        &text[byte..],
                        wrap_width,
                        chunk.ascii_only(),
                        &self.policy,
                    );
                    let (len, count, width) = if fit.graphemes == 0 {
                        match decode_grapheme_at(text, byte, &self.policy) {
                            Some(g) => (g.len, 1, g.width),
                            None => return,
                        }
                    } else {
                        (fit.byte_offset, fit.graphemes, fit.columns)
                    };
                    self.push_fragment(chunk_index, byte, len, grapheme, count, width);
                    byte += len;
                    col += width;
                    grapheme += count;
                    self.commit_line();
                }
            }
        }
    }
}
