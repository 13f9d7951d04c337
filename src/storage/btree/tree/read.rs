use std::ops::RangeBounds;

use tracing::warn;

use crate::types::{PageId, Result, TreeError};

use super::super::cursor::Cursor;
use super::super::node::{key_fits, LeafNode, Node};
use super::{BPlusTree, Descent, PathEntry};

impl BPlusTree {
    /// Returns the value stored under `key`, or `None` if it is absent.
    pub fn get(&self, key: u64) -> Result<Option<Vec<u8>>> {
        if !key_fits(&self.config, key) {
            return Ok(None);
        }
        let descent = self.descend(key)?;
        Ok(descent.leaf.get(key).map(<[u8]>::to_vec))
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: u64) -> Result<bool> {
        if !key_fits(&self.config, key) {
            return Ok(false);
        }
        Ok(self.descend(key)?.leaf.search(key).is_ok())
    }

    /// Number of records, counted along the leaf chain.
    pub fn len(&self) -> Result<usize> {
        let mut total = 0;
        let mut visited = 0;
        let mut next = Some(self.leftmost_leaf()?);
        while let Some(page_id) = next {
            visited += 1;
            self.check_depth(page_id, visited)?;
            let leaf = self.load_chained_leaf(page_id)?;
            total += leaf.records.len();
            next = leaf.next;
        }
        Ok(total)
    }

    /// Whether the tree holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        let leaf = self.load_chained_leaf(self.leftmost_leaf()?)?;
        Ok(leaf.records.is_empty())
    }

    /// Number of levels from the root down to the leaves; 1 for a lonely root.
    pub fn height(&self) -> Result<usize> {
        let mut levels = 1;
        let mut current = self.root;
        loop {
            match self.load(current)? {
                Node::LonelyRoot(_) | Node::Leaf(_) => return Ok(levels),
                Node::Root(inner) | Node::Internal(inner) => {
                    current = inner.children[0];
                    levels += 1;
                    self.check_depth(current, levels)?;
                }
            }
        }
    }

    /// Iterates over every record in ascending key order.
    pub fn iter(&self) -> Result<Cursor<'_>> {
        self.range(..)
    }

    /// Iterates over the records whose keys fall within `bounds`, ascending.
    pub fn range<R: RangeBounds<u64>>(&self, bounds: R) -> Result<Cursor<'_>> {
        Cursor::new(self, bounds.start_bound().cloned(), bounds.end_bound().cloned())
    }

    /// Walks from the root to the leaf whose range contains `key`, recording the
    /// internal nodes passed through.
    pub(in crate::storage::btree) fn descend(&self, key: u64) -> Result<Descent> {
        let mut path = Vec::new();
        let mut current = self.root;
        loop {
            let node = self.load(current)?;
            let is_root = current == self.root;
            if node.is_root() != is_root {
                warn!(page = current.0, kind = node.kind_name(), "btree.descend.misplaced_node");
                return Err(TreeError::corrupt(
                    current,
                    if is_root {
                        "root page holds a non-root node"
                    } else {
                        "child page holds a root node"
                    },
                ));
            }
            match node {
                Node::LonelyRoot(leaf) | Node::Leaf(leaf) => {
                    self.stats.inc_leaf_searches();
                    return Ok(Descent {
                        path,
                        leaf_id: current,
                        leaf,
                        leaf_is_root: is_root,
                    });
                }
                Node::Root(inner) | Node::Internal(inner) => {
                    self.stats.inc_internal_searches();
                    let child_idx = inner.child_index(key);
                    let child = inner.children[child_idx];
                    path.push(PathEntry {
                        page_id: current,
                        node: inner,
                        child_idx,
                    });
                    self.check_depth(child, path.len() + 1)?;
                    current = child;
                }
            }
        }
    }

    /// Largest key in the tree.
    pub fn last_key(&self) -> Result<Option<u64>> {
        let mut current = self.root;
        let mut levels = 1;
        loop {
            match self.load(current)? {
                Node::LonelyRoot(leaf) | Node::Leaf(leaf) => return Ok(leaf.last_key()),
                Node::Root(inner) | Node::Internal(inner) => {
                    current = inner.children[inner.children.len() - 1];
                    levels += 1;
                    self.check_depth(current, levels)?;
                }
            }
        }
    }

    /// Smallest key in the tree.
    pub fn first_key(&self) -> Result<Option<u64>> {
        let leaf = self.load_chained_leaf(self.leftmost_leaf()?)?;
        Ok(leaf.first_key())
    }

    pub(in crate::storage::btree) fn leftmost_leaf(&self) -> Result<PageId> {
        let mut current = self.root;
        let mut levels = 1;
        loop {
            match self.load(current)? {
                Node::LonelyRoot(_) | Node::Leaf(_) => return Ok(current),
                Node::Root(inner) | Node::Internal(inner) => {
                    current = inner.children[0];
                    levels += 1;
                    self.check_depth(current, levels)?;
                }
            }
        }
    }

    /// Loads a page reached through a sibling link or as the leftmost leaf.
    pub(in crate::storage::btree) fn load_chained_leaf(
        &self,
        page_id: PageId,
    ) -> Result<LeafNode> {
        match self.load(page_id)? {
            Node::LonelyRoot(leaf) | Node::Leaf(leaf) => Ok(leaf),
            Node::Root(_) | Node::Internal(_) => Err(TreeError::corrupt(
                page_id,
                "leaf link points at an internal node",
            )),
        }
    }

    /// A path longer than the number of allocated pages can only be a cycle.
    pub(in crate::storage::btree) fn check_depth(
        &self,
        page_id: PageId,
        levels: usize,
    ) -> Result<()> {
        if levels as u64 > self.pager.page_count() {
            return Err(TreeError::corrupt(page_id, "child links form a cycle"));
        }
        Ok(())
    }
}
