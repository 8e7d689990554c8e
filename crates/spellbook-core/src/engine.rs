//! Layered range engine.
//!
//! A segment tree over positions `1..=n` that keeps, per node, enough to
//! answer "what is the signed energy of this whole span" in O(1):
//!
//! ```text
//! cover   pending coverage delta not yet pushed to the children
//!         (on a leaf: the position's full coverage count)
//! even    positions in the span whose coverage count is even
//! winner  Bare | Top(label) | Mixed
//! floor   lowest winning key in the span, None if any position is bare
//! energy  signed contribution sum of the span
//! ```
//!
//! Coverage changes only ever flip parity classes, so a node that is fully
//! covered just swaps its even/odd counts and negates its energy. A label
//! proposal replaces a node's resident winner wholesale when the node has a
//! single winner with a lower key; `Mixed` nodes are split until every
//! position has been compared.
//!
//! Every node overwrite goes through [`RangeEngine::write`], which records
//! the previous node in a [`Journal`] first. [`RangeEngine::undo_last`]
//! therefore restores the tree bit-for-bit.

use spellbook_journal::{Checkpoint, Journal, Revert};

use crate::layer::{Label, Layer};
use crate::timeline::LayerState;
use crate::{CoreError, Result};

/// Who wins the positions of a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Winner {
    /// No layer covers any position.
    Bare,
    /// One label wins every position.
    Top(Label),
    /// Positions disagree; ask the children.
    Mixed,
}

impl Winner {
    fn merge(left: Winner, right: Winner) -> Winner {
        if left == right && left != Winner::Mixed { left } else { Winner::Mixed }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    cover: i64,
    even: u32,
    winner: Winner,
    floor: Option<i64>,
    energy: i128,
}

impl Node {
    fn fresh(width: u32) -> Self {
        Self { cover: 0, even: width, winner: Winner::Bare, floor: None, energy: 0 }
    }

    /// Apply a coverage delta to every position of the span.
    fn flipped(self, delta: i64, width: u32) -> Self {
        let mut node = self;
        node.cover += delta;
        if delta.rem_euclid(2) == 1 {
            node.even = width - node.even;
            node.energy = -node.energy;
        }
        node
    }

    /// Make `winner` the single winner of the span.
    fn won_by(self, winner: Winner, width: u32) -> Self {
        let mut node = self;
        node.winner = winner;
        match winner {
            Winner::Top(label) => {
                node.floor = Some(label.key);
                node.energy = label.span_energy(node.even, width - node.even);
            }
            Winner::Bare => {
                node.floor = None;
                node.energy = 0;
            }
            Winner::Mixed => {}
        }
        node
    }

    fn merge(left: Node, right: Node) -> Self {
        let floor = match (left.floor, right.floor) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        Self {
            cover: 0,
            even: left.even + right.even,
            winner: Winner::merge(left.winner, right.winner),
            floor,
            energy: left.energy + right.energy,
        }
    }
}

/// Journal entry: node `index` held `prev` before an overwrite.
#[derive(Debug)]
struct NodeWrite {
    index: usize,
    prev: Node,
}

impl Revert<[Node]> for NodeWrite {
    fn revert(self, nodes: &mut [Node]) {
        nodes[self.index] = self.prev;
    }
}

/// Derived state of a single position, as reported by [`RangeEngine::probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Number of active layers covering the position.
    pub coverage: i64,
    /// Winning label, `None` when nothing covers the position.
    pub top: Option<Label>,
    /// Signed contribution on top of the base value.
    pub contribution: i128,
}

/// Segment tree of coverage parity and winning labels with exact rollback.
#[derive(Debug)]
pub struct RangeEngine {
    len: usize,
    base_sum: i128,
    nodes: Vec<Node>,
    journal: Journal<NodeWrite>,
}

impl RangeEngine {
    /// Build an engine over the given base values (position `i` is `base[i - 1]`).
    pub fn new(base: &[i64]) -> Self {
        let len = base.len();
        let base_sum = base.iter().map(|&v| v as i128).sum();
        let mut engine = Self {
            len,
            base_sum,
            nodes: vec![Node::fresh(0); 4 * len.max(1)],
            journal: Journal::new(),
        };
        if len > 0 {
            engine.build(1, 1, len);
        }
        tracing::debug!(positions = len, base_sum = %base_sum, "range engine built");
        engine
    }

    fn build(&mut self, index: usize, lo: usize, hi: usize) {
        self.nodes[index] = Node::fresh((hi - lo + 1) as u32);
        if lo < hi {
            let mid = (lo + hi) / 2;
            self.build(2 * index, lo, mid);
            self.build(2 * index + 1, mid + 1, hi);
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the engine has no positions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sum of the immutable base values.
    pub fn base_sum(&self) -> i128 {
        self.base_sum
    }

    /// Number of node overwrites that can still be undone.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Base sum plus every position's contribution.
    pub fn total(&self) -> i128 {
        self.base_sum + self.nodes.get(1).map_or(0, |root| root.energy)
    }

    /// Current journal position, for a later [`RangeEngine::undo_last`].
    pub fn mark(&self) -> Checkpoint {
        self.journal.mark()
    }

    /// Add `delta` to the coverage count of every position in `start..=end`.
    pub fn add_coverage(&mut self, start: usize, end: usize, delta: i64) -> Result<()> {
        self.check_range(start, end)?;
        if delta != 0 {
            self.cover_range(1, 1, self.len, start, end, delta);
        }
        Ok(())
    }

    /// Offer `label` to every position in `start..=end`.
    ///
    /// A position takes the label only if it is bare or its current winner
    /// has a strictly lower key. On equal keys the resident label stays.
    pub fn propose_label(&mut self, start: usize, end: usize, label: Label) -> Result<()> {
        self.check_range(start, end)?;
        self.propose(1, 1, self.len, start, end, label);
        Ok(())
    }

    /// Activate a layer: coverage first, then the label.
    ///
    /// Returns the checkpoint that removes exactly this layer again.
    pub fn apply(&mut self, layer: &Layer) -> Result<Checkpoint> {
        let checkpoint = self.journal.mark();
        self.add_coverage(layer.start, layer.end, 1)?;
        self.propose_label(layer.start, layer.end, layer.label)?;
        tracing::trace!(
            start = layer.start,
            end = layer.end,
            key = layer.label.key,
            writes = self.journal.len() - checkpoint.position(),
            "layer applied"
        );
        Ok(checkpoint)
    }

    /// Revert every node overwrite made after `checkpoint`.
    pub fn undo_last(&mut self, checkpoint: Checkpoint) -> Result<usize> {
        let reverted = self.journal.restore(checkpoint, self.nodes.as_mut_slice())?;
        Ok(reverted)
    }

    /// Read the derived state of one position without touching the tree.
    ///
    /// Returns `None` when `pos` is outside `1..=len`.
    pub fn probe(&self, pos: usize) -> Option<Cell> {
        if pos == 0 || pos > self.len {
            return None;
        }

        let (mut index, mut lo, mut hi) = (1, 1, self.len);
        let mut coverage = 0;
        let mut winner = None;
        loop {
            let node = &self.nodes[index];
            coverage += node.cover;
            // The topmost settled node is authoritative; anything below it
            // may still hold a label that was never pushed down.
            if winner.is_none() && node.winner != Winner::Mixed {
                winner = Some(node.winner);
            }
            if lo == hi {
                break;
            }
            let mid = (lo + hi) / 2;
            if pos <= mid {
                index *= 2;
                hi = mid;
            } else {
                index = 2 * index + 1;
                lo = mid + 1;
            }
        }

        let top = match winner {
            Some(Winner::Top(label)) => Some(label),
            _ => None,
        };
        let contribution = top.map_or(0, |label| label.contribution(coverage));
        Some(Cell { coverage, top, contribution })
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        if start == 0 || start > end || end > self.len {
            return Err(CoreError::RangeOutOfBounds { start, end, len: self.len });
        }
        Ok(())
    }

    /// Overwrite a node, journaling the previous value.
    fn write(&mut self, index: usize, node: Node) {
        let prev = self.nodes[index];
        if prev != node {
            self.journal.record(NodeWrite { index, prev });
            self.nodes[index] = node;
        }
    }

    fn cover_range(&mut self, index: usize, lo: usize, hi: usize, start: usize, end: usize, delta: i64) {
        if end < lo || hi < start {
            return;
        }
        if start <= lo && hi <= end {
            let node = self.nodes[index].flipped(delta, (hi - lo + 1) as u32);
            self.write(index, node);
            return;
        }

        self.push_down(index, lo, hi);
        let mid = (lo + hi) / 2;
        self.cover_range(2 * index, lo, mid, start, end, delta);
        self.cover_range(2 * index + 1, mid + 1, hi, start, end, delta);
        self.pull_up(index);
    }

    fn propose(&mut self, index: usize, lo: usize, hi: usize, start: usize, end: usize, label: Label) {
        if end < lo || hi < start {
            return;
        }

        let node = self.nodes[index];
        if node.floor.is_some_and(|floor| floor >= label.key) {
            if let Winner::Top(resident) = node.winner {
                if resident.key == label.key {
                    tracing::trace!(key = label.key, lo, hi, "equal key, resident label kept");
                }
            }
            return;
        }

        if start <= lo && hi <= end && node.winner != Winner::Mixed {
            let node = node.won_by(Winner::Top(label), (hi - lo + 1) as u32);
            self.write(index, node);
            return;
        }

        // Leaves are never Mixed, so this node has children.
        self.push_down(index, lo, hi);
        let mid = (lo + hi) / 2;
        self.propose(2 * index, lo, mid, start, end, label);
        self.propose(2 * index + 1, mid + 1, hi, start, end, label);
        self.pull_up(index);
    }

    /// Hand pending coverage and a settled winner down to both children.
    fn push_down(&mut self, index: usize, lo: usize, hi: usize) {
        let node = self.nodes[index];
        let mid = (lo + hi) / 2;
        let children = [
            (2 * index, (mid - lo + 1) as u32),
            (2 * index + 1, (hi - mid) as u32),
        ];

        if node.cover != 0 {
            for (child, width) in children {
                let flipped = self.nodes[child].flipped(node.cover, width);
                self.write(child, flipped);
            }
            self.write(index, Node { cover: 0, ..node });
        }

        if node.winner != Winner::Mixed {
            for (child, width) in children {
                let current = self.nodes[child];
                if current.winner != node.winner {
                    self.write(child, current.won_by(node.winner, width));
                }
            }
        }
    }

    fn pull_up(&mut self, index: usize) {
        let merged = Node::merge(self.nodes[2 * index], self.nodes[2 * index + 1]);
        self.write(index, merged);
    }
}

impl LayerState for RangeEngine {
    type Mark = Checkpoint;

    fn apply(&mut self, layer: &Layer) -> Result<Checkpoint> {
        RangeEngine::apply(self, layer)
    }

    fn revert(&mut self, mark: Checkpoint) -> Result<()> {
        self.undo_last(mark).map(|_| ())
    }

    fn total(&self) -> i128 {
        RangeEngine::total(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Parity;

    fn label(key: i64, parity: Parity, magnitude: i64) -> Label {
        Label::new(key, parity, magnitude)
    }

    fn contributions(engine: &RangeEngine) -> Vec<i128> {
        (1..=engine.len()).map(|pos| engine.probe(pos).unwrap().contribution).collect()
    }

    #[test]
    fn test_fresh_engine_totals_base() {
        let engine = RangeEngine::new(&[2, 3, 5, 1]);
        assert_eq!(engine.total(), 11);
        assert_eq!(engine.base_sum(), 11);
        assert_eq!(engine.journal_len(), 0);

        let cell = engine.probe(3).unwrap();
        assert_eq!(cell, Cell { coverage: 0, top: None, contribution: 0 });
    }

    #[test]
    fn test_single_layer_sign() {
        let mut engine = RangeEngine::new(&[2, 3, 5, 1]);
        // One layer: coverage 1 is odd, an even-mode label is negative.
        engine.apply(&Layer::new(1, 3, label(1, Parity::Even, 2))).unwrap();
        assert_eq!(engine.total(), 11 - 6);
        assert_eq!(contributions(&engine), vec![-2, -2, -2, 0]);
    }

    #[test]
    fn test_parity_flip_keeps_winner() {
        let mut engine = RangeEngine::new(&[0; 6]);
        let winner = label(10, Parity::Even, 5);
        engine.apply(&Layer::new(1, 6, label(1, Parity::Odd, 1))).unwrap();
        engine.apply(&Layer::new(1, 6, winner)).unwrap();
        assert_eq!(engine.probe(4).unwrap().contribution, 5);

        // A lower-key layer over part of the span changes parity only there.
        let cp = engine.apply(&Layer::new(3, 4, label(2, Parity::Odd, 9))).unwrap();
        assert_eq!(engine.probe(3).unwrap().top, Some(winner));
        assert_eq!(contributions(&engine), vec![5, 5, -5, -5, 5, 5]);

        engine.undo_last(cp).unwrap();
        assert_eq!(contributions(&engine), vec![5; 6]);
    }

    #[test]
    fn test_dominance_limited_to_overlap() {
        let mut engine = RangeEngine::new(&[0; 8]);
        engine.apply(&Layer::new(1, 8, label(1, Parity::Odd, 3))).unwrap();
        engine.apply(&Layer::new(3, 5, label(9, Parity::Even, 7))).unwrap();

        assert_eq!(contributions(&engine), vec![3, 3, 7, 7, 7, 3, 3, 3]);
        assert_eq!(engine.probe(2).unwrap().top.map(|l| l.key), Some(1));
        assert_eq!(engine.probe(4).unwrap().top.map(|l| l.key), Some(9));
        assert_eq!(engine.total(), 3 * 5 + 7 * 3);
    }

    #[test]
    fn test_lower_key_never_displaces() {
        let mut engine = RangeEngine::new(&[0; 5]);
        engine.apply(&Layer::new(2, 4, label(50, Parity::Odd, 4))).unwrap();
        engine.apply(&Layer::new(1, 5, label(10, Parity::Odd, 1))).unwrap();

        let keys: Vec<_> = (1..=5).map(|p| engine.probe(p).unwrap().top.unwrap().key).collect();
        assert_eq!(keys, vec![10, 50, 50, 50, 10]);
        // coverage: 1,2,2,2,1
        assert_eq!(contributions(&engine), vec![1, -4, -4, -4, 1]);
    }

    #[test]
    fn test_equal_key_keeps_resident() {
        let mut engine = RangeEngine::new(&[0; 3]);
        let first = label(5, Parity::Even, 2);
        engine.apply(&Layer::new(1, 3, first)).unwrap();
        engine.apply(&Layer::new(2, 3, label(5, Parity::Odd, 8))).unwrap();

        assert_eq!(engine.probe(3).unwrap().top, Some(first));
        assert_eq!(contributions(&engine), vec![-2, 2, 2]);
    }

    #[test]
    fn test_mixed_span_compared_per_position() {
        let mut engine = RangeEngine::new(&[0; 8]);
        engine.apply(&Layer::new(1, 2, label(30, Parity::Odd, 1))).unwrap();
        engine.apply(&Layer::new(5, 6, label(5, Parity::Odd, 1))).unwrap();
        engine.apply(&Layer::new(1, 8, label(20, Parity::Odd, 2))).unwrap();

        let keys: Vec<_> = (1..=8).map(|p| engine.probe(p).unwrap().top.unwrap().key).collect();
        assert_eq!(keys, vec![30, 30, 20, 20, 20, 20, 20, 20]);
    }

    #[test]
    fn test_undo_restores_exactly() {
        let mut engine = RangeEngine::new(&[4, -1, 7, 0, 3, 3, -9]);
        engine.apply(&Layer::new(2, 6, label(3, Parity::Odd, 4))).unwrap();

        let before_total = engine.total();
        let before_cells: Vec<_> = (1..=7).map(|p| engine.probe(p).unwrap()).collect();
        let before_journal = engine.journal_len();

        let cp = engine.mark();
        engine.apply(&Layer::new(1, 4, label(8, Parity::Even, 6))).unwrap();
        engine.apply(&Layer::new(4, 7, label(1, Parity::Odd, 2))).unwrap();
        engine.add_coverage(3, 3, -1).unwrap();
        assert_ne!(engine.total(), before_total);

        engine.undo_last(cp).unwrap();
        assert_eq!(engine.total(), before_total);
        assert_eq!(engine.journal_len(), before_journal);
        let after_cells: Vec<_> = (1..=7).map(|p| engine.probe(p).unwrap()).collect();
        assert_eq!(after_cells, before_cells);
    }

    #[test]
    fn test_stale_checkpoint_fails() {
        let mut engine = RangeEngine::new(&[1, 1]);
        let base = engine.mark();
        let cp = engine.apply(&Layer::new(1, 2, label(1, Parity::Even, 1))).unwrap();
        let ahead = engine.mark();
        engine.undo_last(cp).unwrap();
        assert_eq!(engine.mark(), base);

        let err = engine.undo_last(ahead).unwrap_err();
        assert!(matches!(err, CoreError::Journal(_)));
    }

    #[test]
    fn test_range_checked() {
        let mut engine = RangeEngine::new(&[0; 4]);
        let l = label(1, Parity::Even, 1);
        assert!(matches!(engine.add_coverage(0, 2, 1), Err(CoreError::RangeOutOfBounds { .. })));
        assert!(matches!(engine.add_coverage(3, 2, 1), Err(CoreError::RangeOutOfBounds { .. })));
        assert!(matches!(engine.propose_label(1, 5, l), Err(CoreError::RangeOutOfBounds { .. })));
        assert_eq!(engine.journal_len(), 0);
    }

    #[test]
    fn test_probe_out_of_range() {
        let engine = RangeEngine::new(&[0; 4]);
        assert!(engine.probe(0).is_none());
        assert!(engine.probe(5).is_none());
    }

    #[test]
    fn test_empty_engine() {
        let engine = RangeEngine::new(&[]);
        assert!(engine.is_empty());
        assert_eq!(engine.total(), 0);
        assert!(engine.probe(1).is_none());
    }

    #[test]
    fn test_coverage_counts() {
        let mut engine = RangeEngine::new(&[0; 5]);
        engine.add_coverage(1, 5, 1).unwrap();
        engine.add_coverage(2, 3, 1).unwrap();
        engine.add_coverage(3, 5, 1).unwrap();

        let coverage: Vec<_> = (1..=5).map(|p| engine.probe(p).unwrap().coverage).collect();
        assert_eq!(coverage, vec![1, 2, 3, 2, 2]);
        // Nothing labelled yet, so nothing contributes.
        assert_eq!(engine.total(), 0);
    }
}
