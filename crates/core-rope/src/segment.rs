//! Rope leaves and their measure monoid.
//!
//! A segment is one of exactly three things: a run of text, a hard line
//! break, or the zero-weight marker opening a logical line. All leaf
//! behavior the tree needs lives in [`Segment::measure`]; interior nodes
//! only ever combine [`Measure`]s.
//!
//! Structural invariants over any buffer's segment sequence:
//! - the sequence begins with `LineStart`;
//! - every `Break` is immediately followed by a `LineStart`;
//! - two `LineStart`s never touch without a `Break` between them.

use crate::chunk::TextChunk;

/// One rope leaf.
#[derive(Debug, Clone)]
pub enum Segment {
    Text(TextChunk),
    /// Hard newline; occupies one column of buffer weight.
    Break,
    /// Zero-weight marker at the first column of a logical line.
    LineStart,
}

impl Segment {
    pub fn measure(&self) -> Measure {
        match self {
            Segment::Text(chunk) => Measure::text(chunk.width()),
            Segment::Break => Measure::BREAK,
            Segment::LineStart => Measure::LINE_START,
        }
    }

    /// Display weight this leaf contributes to buffer offsets.
    pub fn weight(&self) -> usize {
        match self {
            Segment::Text(chunk) => chunk.width(),
            Segment::Break => 1,
            Segment::LineStart => 0,
        }
    }

    pub fn is_line_start(&self) -> bool {
        matches!(self, Segment::LineStart)
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Segment::Break)
    }

    pub fn as_chunk(&self) -> Option<&TextChunk> {
        match self {
            Segment::Text(chunk) => Some(chunk),
            _ => None,
        }
    }
}

/// Aggregated metrics of a segment sequence.
///
/// `head` is the width before the first `LineStart`, `tail` the width
/// after the last one, and `max_full` the maximum *display* width over
/// lines fully contained in the sequence (the trailing `Break`'s weight
/// already subtracted). When `starts == 0` the whole sequence is one open
/// fragment and `head == tail == width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measure {
    pub width: usize,
    pub starts: usize,
    pub head: usize,
    pub tail: usize,
    pub max_full: usize,
}

impl Measure {
    pub const ZERO: Measure = Measure {
        width: 0,
        starts: 0,
        head: 0,
        tail: 0,
        max_full: 0,
    };

    pub const BREAK: Measure = Measure {
        width: 1,
        starts: 0,
        head: 1,
        tail: 1,
        max_full: 0,
    };

    pub const LINE_START: Measure = Measure {
        width: 0,
        starts: 1,
        head: 0,
        tail: 0,
        max_full: 0,
    };

    pub fn text(width: usize) -> Measure {
        Measure {
            width,
            starts: 0,
            head: width,
            tail: width,
            max_full: 0,
        }
    }

    /// Monoid combine: `self` followed by `rhs`.
    pub fn combine(self, rhs: Measure) -> Measure {
        let head = if self.starts > 0 {
            self.head
        } else {
            self.width + rhs.head
        };
        let tail = if rhs.starts > 0 {
            rhs.tail
        } else {
            self.tail + rhs.width
        };
        let mut max_full = self.max_full.max(rhs.max_full);
        if self.starts > 0 && rhs.starts > 0 {
            // The line spanning the seam is complete: it runs from the
            // left side's last LineStart to the right side's first, and
            // its trailing Break contributes 1 to the raw span.
            max_full = max_full.max((self.tail + rhs.head).saturating_sub(1));
        }
        Measure {
            width: self.width + rhs.width,
            starts: self.starts + rhs.starts,
            head,
            tail,
            max_full,
        }
    }

    /// Maximum display width over all lines, counting the trailing open
    /// line. Only meaningful at the root of a buffer's rope.
    pub fn max_line_width(self) -> usize {
        if self.starts == 0 {
            self.head
        } else {
            self.max_full.max(self.tail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(measures: &[Measure]) -> Measure {
        measures
            .iter()
            .copied()
            .fold(Measure::ZERO, Measure::combine)
    }

    #[test]
    fn single_line_metrics() {
        // LineStart, Text(5)
        let m = fold(&[Measure::LINE_START, Measure::text(5)]);
        assert_eq!(m.width, 5);
        assert_eq!(m.starts, 1);
        assert_eq!(m.max_line_width(), 5);
    }

    #[test]
    fn two_line_metrics() {
        // LineStart, Text(5), Break, LineStart, Text(3)
        let m = fold(&[
            Measure::LINE_START,
            Measure::text(5),
            Measure::BREAK,
            Measure::LINE_START,
            Measure::text(3),
        ]);
        assert_eq!(m.width, 9);
        assert_eq!(m.starts, 2);
        assert_eq!(m.max_full, 5);
        assert_eq!(m.tail, 3);
        assert_eq!(m.max_line_width(), 5);
    }

    #[test]
    fn widest_line_in_the_middle() {
        let m = fold(&[
            Measure::LINE_START,
            Measure::text(2),
            Measure::BREAK,
            Measure::LINE_START,
            Measure::text(9),
            Measure::BREAK,
            Measure::LINE_START,
            Measure::text(1),
        ]);
        assert_eq!(m.max_line_width(), 9);
        assert_eq!(m.starts, 3);
    }

    #[test]
    fn empty_lines_measure_zero() {
        // "\n\n": LineStart, Break, LineStart, Break, LineStart
        let m = fold(&[
            Measure::LINE_START,
            Measure::BREAK,
            Measure::LINE_START,
            Measure::BREAK,
            Measure::LINE_START,
        ]);
        assert_eq!(m.starts, 3);
        assert_eq!(m.width, 2);
        assert_eq!(m.max_line_width(), 0);
    }

    #[test]
    fn combine_is_associative_over_samples() {
        let samples = [
            Measure::LINE_START,
            Measure::text(4),
            Measure::BREAK,
            Measure::LINE_START,
            Measure::text(7),
            Measure::BREAK,
            Measure::LINE_START,
        ];
        // ((a·b)·c)·… == a·(b·(c·…)) over every split point
        let full = fold(&samples);
        for split in 1..samples.len() {
            let left = fold(&samples[..split]);
            let right = fold(&samples[split..]);
            assert_eq!(left.combine(right), full, "split at {split}");
        }
    }
}
