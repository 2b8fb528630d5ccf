//! Measured B-tree over segments.
//!
//! Leaves hold short runs of [`Segment`]s; interior nodes cache the
//! monoidal [`Measure`] of their subtree, so weight and line-count
//! queries descend in O(log n). All leaves sit at the same depth: inserts
//! split nodes upward, deletes drop emptied nodes and leave siblings
//! sparse, and a periodic rebuild restores the depth bound when sparsity
//! accumulates.
//!
//! Positions come in two currencies: *segment index* (leaf ordinal) and
//! *display weight* (sum of leaf weights). The weight-addressed editing
//! entry points ([`Rope::insert_slice_by_weight`],
//! [`Rope::delete_range_by_weight`]) resolve weights to segment indices,
//! splitting a straddled text chunk through the caller's
//! [`SegmentSplit`] implementation.

use crate::chunk::TextChunk;
use crate::segment::{Measure, Segment};
use thiserror::Error;

/// Maximum segments per leaf node.
const MAX_SEGS: usize = 8;
/// Maximum children per interior node.
const MAX_CHILDREN: usize = 8;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RopeError {
    #[error("rope index or weight out of bounds")]
    OutOfBounds,
    #[error("split requested on a non-splittable segment")]
    InvalidSplit,
}

/// Splits a text chunk at a display-weight offset strictly inside it.
///
/// The two returned chunks must concatenate byte-identically to the
/// original and their widths must sum to its width; the split byte offset
/// must sit on a grapheme boundary. The rope never asks to split `Break`
/// or `LineStart` segments; weight arithmetic routes around them, and a
/// request that would require it fails with
/// [`RopeError::InvalidSplit`].
pub trait SegmentSplit {
    fn split(&self, chunk: &TextChunk, width: usize) -> Result<(TextChunk, TextChunk), RopeError>;
}

/// Location of a `LineStart` marker: its segment index and the display
/// weight accumulated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPos {
    pub seg_index: usize,
    pub weight: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { segs: Vec<Segment> },
    Internal(Internal),
}

#[derive(Debug, Clone)]
struct Internal {
    children: Vec<Node>,
    measure: Measure,
    count: usize,
    height: u8,
}

impl Internal {
    fn from_children(children: Vec<Node>) -> Self {
        let mut node = Internal {
            children,
            measure: Measure::ZERO,
            count: 0,
            height: 0,
        };
        node.refresh();
        node
    }

    fn refresh(&mut self) {
        self.measure = self
            .children
            .iter()
            .map(Node::measure)
            .fold(Measure::ZERO, Measure::combine);
        self.count = self.children.iter().map(Node::count).sum();
        self.height = self.children.first().map_or(1, |c| c.height() + 1);
    }
}

impl Node {
    fn empty() -> Node {
        Node::Leaf { segs: Vec::new() }
    }

    fn measure(&self) -> Measure {
        match self {
            Node::Leaf { segs } => segs
                .iter()
                .map(Segment::measure)
                .fold(Measure::ZERO, Measure::combine),
            Node::Internal(n) => n.measure,
        }
    }

    fn count(&self) -> usize {
        match self {
            Node::Leaf { segs } => segs.len(),
            Node::Internal(n) => n.count,
        }
    }

    fn height(&self) -> u8 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal(n) => n.height,
        }
    }

    fn get(&self, index: usize) -> Option<&Segment> {
        match self {
            Node::Leaf { segs } => segs.get(index),
            Node::Internal(n) => {
                let mut index = index;
                for child in &n.children {
                    if index < child.count() {
                        return child.get(index);
                    }
                    index -= child.count();
                }
                None
            }
        }
    }

    /// Insert one segment at `index`; returns a split-off right sibling
    /// when this node overflows.
    fn insert_one(&mut self, index: usize, seg: Segment) -> Option<Node> {
        match self {
            Node::Leaf { segs } => {
                segs.insert(index, seg);
                if segs.len() > MAX_SEGS {
                    let right = segs.split_off(segs.len() / 2);
                    Some(Node::Leaf { segs: right })
                } else {
                    None
                }
            }
            Node::Internal(node) => {
                let mut index = index;
                let mut child_i = 0;
                while child_i + 1 < node.children.len() && index > node.children[child_i].count() {
                    index -= node.children[child_i].count();
                    child_i += 1;
                }
                if let Some(right) = node.children[child_i].insert_one(index, seg) {
                    node.children.insert(child_i + 1, right);
                }
                let split = if node.children.len() > MAX_CHILDREN {
                    let right = node.children.split_off(node.children.len() / 2);
                    Some(Node::Internal(Internal::from_children(right)))
                } else {
                    None
                };
                node.refresh();
                split
            }
        }
    }

    /// Remove and return the segment at `index`. Caller checks bounds.
    fn delete_one(&mut self, index: usize) -> Segment {
        match self {
            Node::Leaf { segs } => segs.remove(index),
            Node::Internal(node) => {
                let mut index = index;
                let mut child_i = 0;
                while index >= node.children[child_i].count() {
                    index -= node.children[child_i].count();
                    child_i += 1;
                }
                let removed = node.children[child_i].delete_one(index);
                if node.children[child_i].count() == 0 {
                    node.children.remove(child_i);
                }
                node.refresh();
                removed
            }
        }
    }

    /// First segment whose weight span ends strictly after `w`, as
    /// `(segment index, weight inside that segment)`. Zero-weight
    /// segments sitting exactly at `w` are skipped, so boundary results
    /// always point past markers. `w == total` yields `(count, 0)`.
    fn locate_weight(&self, w: usize) -> (usize, usize) {
        match self {
            Node::Leaf { segs } => {
                let mut w = w;
                for (i, seg) in segs.iter().enumerate() {
                    let sw = seg.weight();
                    if w >= sw {
                        w -= sw;
                    } else {
                        return (i, w);
                    }
                }
                (segs.len(), 0)
            }
            Node::Internal(node) => {
                let mut w = w;
                let mut index = 0;
                for child in &node.children {
                    let cw = child.measure().width;
                    if w >= cw {
                        w -= cw;
                        index += child.count();
                    } else {
                        let (i, within) = child.locate_weight(w);
                        return (index + i, within);
                    }
                }
                (index, 0)
            }
        }
    }

    /// Locate the `ordinal`-th `LineStart` using the aggregated counts.
    fn locate_marker(&self, ordinal: usize) -> Option<MarkerPos> {
        match self {
            Node::Leaf { segs } => {
                let mut ordinal = ordinal;
                let mut weight = 0;
                for (i, seg) in segs.iter().enumerate() {
                    if seg.is_line_start() {
                        if ordinal == 0 {
                            return Some(MarkerPos {
                                seg_index: i,
                                weight,
                            });
                        }
                        ordinal -= 1;
                    }
                    weight += seg.weight();
                }
                None
            }
            Node::Internal(node) => {
                let mut ordinal = ordinal;
                let mut index = 0;
                let mut weight = 0;
                for child in &node.children {
                    let m = child.measure();
                    if ordinal < m.starts {
                        let found = child.locate_marker(ordinal)?;
                        return Some(MarkerPos {
                            seg_index: index + found.seg_index,
                            weight: weight + found.weight,
                        });
                    }
                    ordinal -= m.starts;
                    index += child.count();
                    weight += m.width;
                }
                None
            }
        }
    }

    fn walk_from(&self, skip: usize, index: &mut usize, f: &mut dyn FnMut(usize, &Segment) -> bool) -> bool {
        match self {
            Node::Leaf { segs } => {
                for seg in segs.iter().skip(skip) {
                    if !f(*index, seg) {
                        return false;
                    }
                    *index += 1;
                }
                true
            }
            Node::Internal(node) => {
                let mut skip = skip;
                for child in &node.children {
                    if skip >= child.count() {
                        skip -= child.count();
                        continue;
                    }
                    if !child.walk_from(skip, index, f) {
                        return false;
                    }
                    skip = 0;
                }
                true
            }
        }
    }

    fn drain_into(self, out: &mut Vec<Segment>) {
        match self {
            Node::Leaf { segs } => out.extend(segs),
            Node::Internal(node) => {
                for child in node.children {
                    child.drain_into(out);
                }
            }
        }
    }

    fn build(segs: Vec<Segment>) -> Node {
        if segs.len() <= MAX_SEGS {
            return Node::Leaf { segs };
        }
        let mut level: Vec<Node> = Vec::new();
        let mut cur: Vec<Segment> = Vec::with_capacity(MAX_SEGS);
        for seg in segs {
            cur.push(seg);
            if cur.len() == MAX_SEGS {
                level.push(Node::Leaf {
                    segs: std::mem::take(&mut cur),
                });
            }
        }
        if !cur.is_empty() {
            level.push(Node::Leaf { segs: cur });
        }
        while level.len() > 1 {
            let mut next: Vec<Node> = Vec::new();
            let mut group: Vec<Node> = Vec::with_capacity(MAX_CHILDREN);
            for node in level {
                group.push(node);
                if group.len() == MAX_CHILDREN {
                    next.push(Node::Internal(Internal::from_children(std::mem::take(
                        &mut group,
                    ))));
                }
            }
            if !group.is_empty() {
                next.push(Node::Internal(Internal::from_children(group)));
            }
            level = next;
        }
        level.pop().unwrap_or_else(Node::empty)
    }
}

/// Balanced sequence of segments with aggregated metrics.
#[derive(Debug, Clone)]
pub struct Rope {
    root: Node,
    markers: Option<Vec<MarkerPos>>,
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl Rope {
    pub fn new() -> Self {
        Self {
            root: Node::empty(),
            markers: None,
        }
    }

    /// Number of segments.
    pub fn count(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Tree height (leaves are at height 0).
    pub fn depth(&self) -> usize {
        self.root.height() as usize
    }

    /// Aggregated metrics of the whole sequence, O(1).
    pub fn measure(&self) -> Measure {
        self.root.measure()
    }

    /// Sum of segment weights.
    pub fn total_weight(&self) -> usize {
        self.measure().width
    }

    /// Number of `LineStart` markers, O(1).
    pub fn marker_count(&self) -> usize {
        self.measure().starts
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.root.get(index)
    }

    fn invalidate(&mut self) {
        self.markers = None;
    }

    pub fn append(&mut self, seg: Segment) {
        let at = self.count();
        // In-bounds by construction.
        let _ = self.insert(at, seg);
    }

    pub fn insert(&mut self, index: usize, seg: Segment) -> Result<(), RopeError> {
        if index > self.count() {
            return Err(RopeError::OutOfBounds);
        }
        self.invalidate();
        if let Some(right) = self.root.insert_one(index, seg) {
            let old = std::mem::replace(&mut self.root, Node::empty());
            self.root = Node::Internal(Internal::from_children(vec![old, right]));
        }
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Segment, RopeError> {
        if index >= self.count() {
            return Err(RopeError::OutOfBounds);
        }
        self.invalidate();
        let removed = self.root.delete_one(index);
        self.collapse_root();
        Ok(removed)
    }

    fn collapse_root(&mut self) {
        loop {
            let lowered = match &mut self.root {
                Node::Internal(node) if node.children.len() == 1 => node.children.pop(),
                Node::Internal(node) if node.children.is_empty() => Some(Node::empty()),
                _ => return,
            };
            match lowered {
                Some(child) => self.root = child,
                None => return,
            }
        }
    }

    /// Visit segments in order starting at `start`; the callback returns
    /// `false` to stop early. Returns `true` if the walk ran to the end.
    pub fn walk_from(&self, start: usize, mut f: impl FnMut(usize, &Segment) -> bool) -> bool {
        let mut index = start;
        self.root.walk_from(start, &mut index, &mut f)
    }

    /// Visit every segment in order.
    pub fn walk(&self, f: impl FnMut(usize, &Segment) -> bool) -> bool {
        self.walk_from(0, f)
    }

    /// O(log n) marker lookup straight off the tree, no cache.
    pub fn locate_marker(&self, ordinal: usize) -> Option<MarkerPos> {
        self.root.locate_marker(ordinal)
    }

    /// Marker lookup through the lazily-built ordinal index. The cache is
    /// dropped by every structural mutation and rebuilt by one walk here.
    pub fn get_marker(&mut self, ordinal: usize) -> Option<MarkerPos> {
        self.markers().get(ordinal).copied()
    }

    /// The full marker index, building it if stale.
    pub fn markers(&mut self) -> &[MarkerPos] {
        if self.markers.is_none() {
            let mut markers = Vec::with_capacity(self.marker_count());
            let mut weight = 0usize;
            let mut index = 0usize;
            self.root.walk_from(0, &mut index, &mut |i, seg| {
                if seg.is_line_start() {
                    markers.push(MarkerPos {
                        seg_index: i,
                        weight,
                    });
                }
                weight += seg.weight();
                true
            });
            self.markers = Some(markers);
        }
        self.markers.as_deref().unwrap_or_default()
    }

    /// Resolve a display weight to `(segment index, weight within)`.
    pub fn locate_weight(&self, w: usize) -> Result<(usize, usize), RopeError> {
        if w > self.total_weight() {
            return Err(RopeError::OutOfBounds);
        }
        Ok(self.root.locate_weight(w))
    }

    fn split_at(
        &mut self,
        index: usize,
        within: usize,
        splitter: &dyn SegmentSplit,
    ) -> Result<(), RopeError> {
        let seg = self.get(index).ok_or(RopeError::OutOfBounds)?;
        let Segment::Text(chunk) = seg else {
            return Err(RopeError::InvalidSplit);
        };
        let (left, right) = splitter.split(chunk, within)?;
        self.delete(index)?;
        self.insert(index, Segment::Text(right))?;
        self.insert(index, Segment::Text(left))?;
        Ok(())
    }

    /// Insert a segment slice at a display-weight position.
    ///
    /// A weight landing inside a text chunk splits it through `splitter`;
    /// a weight on a boundary inserts without splitting, skipping past
    /// any zero-weight markers sitting there (so text inserted at a line
    /// start lands after the `LineStart`).
    pub fn insert_slice_by_weight(
        &mut self,
        weight: usize,
        slice: Vec<Segment>,
        splitter: &dyn SegmentSplit,
    ) -> Result<(), RopeError> {
        let (index, within) = self.locate_weight(weight)?;
        let at = if within == 0 {
            index
        } else {
            self.split_at(index, within, splitter)?;
            index + 1
        };
        for (k, seg) in slice.into_iter().enumerate() {
            self.insert(at + k, seg)?;
        }
        Ok(())
    }

    /// Delete every segment whose weight span falls inside `[start, end)`,
    /// splitting the straddling chunks at the boundaries.
    ///
    /// Zero-weight segments at the start boundary survive (the line's
    /// `LineStart` stays with its line); zero-weight segments strictly
    /// inside or at the end boundary go, which is exactly what keeps a
    /// deleted `Break` and its trailing `LineStart` paired.
    pub fn delete_range_by_weight(
        &mut self,
        start: usize,
        end: usize,
        splitter: &dyn SegmentSplit,
    ) -> Result<(), RopeError> {
        if start > end || end > self.total_weight() {
            return Err(RopeError::OutOfBounds);
        }
        if start == end {
            return Ok(());
        }
        let (index, within) = self.locate_weight(start)?;
        if within > 0 {
            self.split_at(index, within, splitter)?;
        }
        let (index, within) = self.locate_weight(end)?;
        if within > 0 {
            self.split_at(index, within, splitter)?;
        }
        let (first, _) = self.locate_weight(start)?;
        let (last, _) = self.locate_weight(end)?;
        for _ in first..last {
            self.delete(first)?;
        }
        self.rebalance();
        Ok(())
    }

    /// Restore the depth bound if deletions have left the tree sparse.
    pub fn rebalance(&mut self) {
        let count = self.count();
        let height = self.depth() as u32;
        // Insert splits keep nodes at least half full, so a healthy tree
        // of n segments satisfies 4^height <= 8n. Anything past that is
        // deletion sparsity; rebuild from the leaf sequence.
        if height > 2 && 4usize.saturating_pow(height) > count.saturating_mul(8) {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let mut segs = Vec::with_capacity(self.count());
        let root = std::mem::replace(&mut self.root, Node::empty());
        root.drain_into(&mut segs);
        self.root = Node::build(segs);
        self.invalidate();
    }

    /// Clone out the full segment sequence (test and rebuild helper).
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::with_capacity(self.count());
        self.walk(|_, seg| {
            out.push(seg.clone());
            true
        });
        out
    }
}
