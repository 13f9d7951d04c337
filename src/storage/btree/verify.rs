use std::collections::HashSet;
use std::ops::Bound;

use tracing::debug;

use crate::types::{PageId, Result, TreeError};

use super::node::{LeafNode, Node};
use super::tree::BPlusTree;

/// Shape of a tree that passed [`BPlusTree::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Levels from the root to the leaves.
    pub height: usize,
    /// Number of leaf pages, counting a lonely root.
    pub leaf_pages: usize,
    /// Number of internal pages, counting an internal root.
    pub internal_pages: usize,
    /// Total records stored.
    pub records: usize,
}

struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<(PageId, Option<PageId>)>,
    seen: HashSet<PageId>,
    report: VerifyReport,
}

/// A page waiting to be checked, with the key range its parent allows.
struct Pending {
    page_id: PageId,
    depth: usize,
    lower: Bound<u64>,
    upper: Bound<u64>,
}

impl BPlusTree {
    /// Walks the whole tree and checks its structural invariants.
    ///
    /// Every leaf must sit at the same depth, non-root nodes must hold at least
    /// their minimum fill, separators must bound the keys beneath them, and the
    /// leaf sibling chain must visit the leaves in key order. Any violation is
    /// reported as [`TreeError::CorruptPage`] naming the offending page.
    pub fn verify(&self) -> Result<VerifyReport> {
        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            seen: HashSet::new(),
            report: VerifyReport::default(),
        };
        let mut stack = vec![Pending {
            page_id: self.root,
            depth: 1,
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }];
        // Children are pushed right to left so leaves pop in key order.
        while let Some(pending) = stack.pop() {
            self.verify_page(pending, &mut walk, &mut stack)?;
        }

        for pair in walk.leaves.windows(2) {
            let (page, next) = pair[0];
            if next != Some(pair[1].0) {
                return Err(TreeError::corrupt(page, "leaf sibling link skips a leaf"));
            }
        }
        if let Some(&(page, next)) = walk.leaves.last() {
            if next.is_some() {
                return Err(TreeError::corrupt(page, "last leaf has a sibling link"));
            }
        }

        walk.report.height = walk.leaf_depth.unwrap_or(1);
        debug!(
            height = walk.report.height,
            leaves = walk.report.leaf_pages,
            internals = walk.report.internal_pages,
            records = walk.report.records,
            "btree.verify"
        );
        Ok(walk.report)
    }

    fn verify_page(
        &self,
        pending: Pending,
        walk: &mut Walk,
        stack: &mut Vec<Pending>,
    ) -> Result<()> {
        let Pending {
            page_id,
            depth,
            lower,
            upper,
        } = pending;
        if !walk.seen.insert(page_id) {
            return Err(TreeError::corrupt(page_id, "page reachable from two parents"));
        }
        self.check_depth(page_id, depth)?;
        let node = self.load(page_id)?;
        let is_root = depth == 1;
        if node.is_root() != is_root {
            debug!(page = page_id.0, kind = node.kind_name(), "btree.verify.misplaced_node");
            return Err(TreeError::corrupt(page_id, "root variant in the wrong position"));
        }
        match node {
            Node::LonelyRoot(leaf) | Node::Leaf(leaf) => {
                self.verify_leaf(page_id, &leaf, depth, lower, upper, walk)
            }
            Node::Root(inner) | Node::Internal(inner) => {
                let min = if is_root { 2 } else { self.config.min_children() };
                if inner.fanout() < min {
                    return Err(TreeError::corrupt(page_id, "internal node underfull"));
                }
                if inner.fanout() > self.config.max_children() {
                    return Err(TreeError::corrupt(page_id, "internal node overfull"));
                }
                if inner.keys.iter().any(|key| !within(*key, lower, upper)) {
                    return Err(TreeError::corrupt(page_id, "separator outside parent range"));
                }
                walk.report.internal_pages += 1;
                for (idx, child) in inner.children.iter().enumerate().rev() {
                    stack.push(Pending {
                        page_id: *child,
                        depth: depth + 1,
                        lower: match idx {
                            0 => lower,
                            _ => Bound::Included(inner.keys[idx - 1]),
                        },
                        upper: inner.keys.get(idx).map_or(upper, |key| Bound::Excluded(*key)),
                    });
                }
                Ok(())
            }
        }
    }

    fn verify_leaf(
        &self,
        page_id: PageId,
        leaf: &LeafNode,
        depth: usize,
        lower: Bound<u64>,
        upper: Bound<u64>,
        walk: &mut Walk,
    ) -> Result<()> {
        match walk.leaf_depth {
            None => walk.leaf_depth = Some(depth),
            Some(expected) if expected != depth => {
                return Err(TreeError::corrupt(page_id, "leaves at uneven depth"));
            }
            Some(_) => {}
        }
        if depth > 1 && leaf.records.len() < self.config.min_leaf_entries() {
            return Err(TreeError::corrupt(page_id, "leaf underfull"));
        }
        if leaf.records.iter().any(|r| !within(r.key, lower, upper)) {
            return Err(TreeError::corrupt(page_id, "leaf key outside parent range"));
        }
        walk.report.leaf_pages += 1;
        walk.report.records += leaf.records.len();
        walk.leaves.push((page_id, leaf.next));
        Ok(())
    }
}

fn within(key: u64, lower: Bound<u64>, upper: Bound<u64>) -> bool {
    let above = match lower {
        Bound::Included(lo) => key >= lo,
        Bound::Excluded(lo) => key > lo,
        Bound::Unbounded => true,
    };
    let below = match upper {
        Bound::Included(hi) => key <= hi,
        Bound::Excluded(hi) => key < hi,
        Bound::Unbounded => true,
    };
    above && below
}
