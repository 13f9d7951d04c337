use std::ops::Bound;

use crate::types::{PageId, Result};

use super::node::LeafNode;
use super::tree::BPlusTree;

/// Ascending iterator over a key range, following leaf sibling links.
///
/// Yields `Err` at most once; after an error the iterator is exhausted.
pub struct Cursor<'a> {
    tree: &'a BPlusTree,
    upper: Bound<u64>,
    leaf: LeafNode,
    slot_index: usize,
    visited: usize,
    done: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tree: &'a BPlusTree, lower: Bound<u64>, upper: Bound<u64>) -> Result<Self> {
        let empty = match (lower, upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi))
            | (Bound::Excluded(lo), Bound::Included(hi)) => lo >= hi,
            (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi || lo + 1 == hi,
            _ => false,
        };
        if empty || lower == Bound::Excluded(u64::MAX) {
            return Ok(Self {
                tree,
                upper,
                leaf: LeafNode::default(),
                slot_index: 0,
                visited: 0,
                done: true,
            });
        }

        let (leaf, slot_index) = match lower {
            Bound::Unbounded => {
                let first = tree.leftmost_leaf()?;
                (tree.load_chained_leaf(first)?, 0)
            }
            Bound::Included(lo) => {
                let leaf = tree.descend(lo)?.leaf;
                let idx = leaf.records.partition_point(|r| r.key < lo);
                (leaf, idx)
            }
            Bound::Excluded(lo) => {
                let leaf = tree.descend(lo)?.leaf;
                let idx = leaf.records.partition_point(|r| r.key <= lo);
                (leaf, idx)
            }
        };
        Ok(Self {
            tree,
            upper,
            leaf,
            slot_index,
            visited: 1,
            done: false,
        })
    }

    fn within_upper(&self, key: u64) -> bool {
        match self.upper {
            Bound::Included(hi) => key <= hi,
            Bound::Excluded(hi) => key < hi,
            Bound::Unbounded => true,
        }
    }

    fn advance_leaf(&mut self, next: PageId) -> Result<()> {
        self.visited += 1;
        self.tree.check_depth(next, self.visited)?;
        self.leaf = self.tree.load_chained_leaf(next)?;
        self.slot_index = 0;
        Ok(())
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(record) = self.leaf.records.get(self.slot_index) {
                if !self.within_upper(record.key) {
                    self.done = true;
                    return None;
                }
                self.slot_index += 1;
                return Some(Ok((record.key, record.value.clone())));
            }
            let Some(next) = self.leaf.next else {
                self.done = true;
                return None;
            };
            if let Err(err) = self.advance_leaf(next) {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

impl std::iter::FusedIterator for Cursor<'_> {}
