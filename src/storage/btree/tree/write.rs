use tracing::trace;

use crate::types::{PageId, Result, TreeError};

use super::super::node::{LeafPut, Node, Record};
use super::{BPlusTree, Descent, PathEntry};

impl BPlusTree {
    /// Inserts `value` under `key`, replacing the value if the key already exists.
    ///
    /// Overfull nodes are split on the way back up; every touched page, and the
    /// root pointer in page 0 if it moved, is written before this returns.
    pub fn insert(&mut self, key: u64, value: &[u8]) -> Result<()> {
        let record = Record::new(&self.config, key, value)?;
        let Descent {
            path,
            leaf_id,
            mut leaf,
            leaf_is_root,
        } = self.descend(key)?;

        if let LeafPut::Replaced(_) = leaf.put(record) {
            self.stats.inc_overwrites();
        }
        if leaf.records.len() <= self.config.max_leaf_entries() {
            let node = if leaf_is_root {
                Node::LonelyRoot(leaf)
            } else {
                Node::Leaf(leaf)
            };
            return self.store(leaf_id, &node);
        }

        let right_id = self.pager.allocate_page()?;
        let (separator, right) = leaf.split();
        leaf.next = Some(right_id);
        // The right half goes first so the left never links to an unwritten page.
        self.store(right_id, &Node::Leaf(right))?;
        self.store(leaf_id, &Node::Leaf(leaf))?;
        self.stats.inc_leaf_splits();
        trace!(
            target: "bplustree::split",
            left = leaf_id.0,
            right = right_id.0,
            separator,
            "split leaf page"
        );
        self.propagate_split(path, leaf_id, separator, right_id)
    }

    /// Inserts many records whose keys are strictly ascending and all greater
    /// than the current largest key.
    ///
    /// The whole batch is validated before anything is written; a violation
    /// returns [`TreeError::Unsorted`] and leaves the tree untouched.
    pub fn batch_insert<I, V>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, V)>,
        V: AsRef<[u8]>,
    {
        let mut records = Vec::new();
        let mut floor = self.last_key()?;
        for (key, value) in items {
            if floor.is_some_and(|prev| key <= prev) {
                return Err(TreeError::Unsorted);
            }
            records.push(Record::new(&self.config, key, value.as_ref())?);
            floor = Some(key);
        }
        let count = records.len();
        for record in records {
            self.insert(record.key, &record.value)?;
        }
        trace!(count, "btree.batch_insert");
        Ok(())
    }

    /// Pushes `separator`/`right_id` into successive parents until one has room
    /// or a new root is created.
    fn propagate_split(
        &mut self,
        mut path: Vec<PathEntry>,
        mut left_id: PageId,
        mut separator: u64,
        mut right_id: PageId,
    ) -> Result<()> {
        while let Some(PathEntry {
            page_id,
            mut node,
            child_idx,
        }) = path.pop()
        {
            let is_root = path.is_empty();
            node.insert_split(child_idx, separator, right_id);
            if node.fanout() <= self.config.max_children() {
                let node = if is_root {
                    Node::Root(node)
                } else {
                    Node::Internal(node)
                };
                return self.store(page_id, &node);
            }

            let new_right = self.pager.allocate_page()?;
            let (promoted, upper) = node.split();
            self.store(new_right, &Node::Internal(upper))?;
            self.store(page_id, &Node::Internal(node))?;
            self.stats.inc_internal_splits();
            trace!(
                target: "bplustree::split",
                left = page_id.0,
                right = new_right.0,
                promoted,
                "split internal page"
            );
            left_id = page_id;
            separator = promoted;
            right_id = new_right;
        }

        self.create_new_root(left_id, separator, right_id)
    }

    fn create_new_root(&mut self, left: PageId, separator: u64, right: PageId) -> Result<()> {
        let root_id = self.pager.allocate_page()?;
        let root = Node::root(&self.config, left, separator, right);
        self.store(root_id, &root)?;
        self.pager.set_root(root_id)?;
        self.root = root_id;
        self.stats.inc_root_splits();
        trace!(
            target: "bplustree::split",
            root = root_id.0,
            left = left.0,
            right = right.0,
            "grew new root"
        );
        Ok(())
    }
}
