use crate::types::{PageId, Result, TreeError};

use super::config::TreeConfig;

/// One key/value entry stored in a leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Numeric key, encoded big-endian into `key_size` bytes.
    pub key: u64,
    /// Value bytes, at most `value_size` long.
    pub value: Vec<u8>,
}

impl Record {
    /// Builds a record after checking it fits the configured slot widths.
    pub fn new(config: &TreeConfig, key: u64, value: &[u8]) -> Result<Self> {
        if !key_fits(config, key) {
            return Err(TreeError::KeyTooLarge {
                key,
                key_size: config.key_size(),
            });
        }
        if value.len() > config.value_size() {
            return Err(TreeError::ValueTooLarge {
                len: value.len(),
                value_size: config.value_size(),
            });
        }
        Ok(Self {
            key,
            value: value.to_vec(),
        })
    }
}

/// Returns true when `key` can be encoded in `config.key_size()` bytes.
pub fn key_fits(config: &TreeConfig, key: u64) -> bool {
    let width = config.key_size();
    width >= 8 || key >> (width * 8) == 0
}

/// Ordered records of a leaf or lonely root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafNode {
    /// Records in strictly ascending key order.
    pub records: Vec<Record>,
    /// Right sibling in key order; always `None` for a lonely root.
    pub next: Option<PageId>,
}

/// Outcome of placing a record into a leaf.
#[derive(Debug, PartialEq, Eq)]
pub enum LeafPut {
    /// A new record was added.
    Inserted,
    /// An existing key had its value replaced.
    Replaced(Vec<u8>),
}

impl LeafNode {
    /// Index of `key`, or the position it would be inserted at.
    pub fn search(&self, key: u64) -> std::result::Result<usize, usize> {
        self.records.binary_search_by_key(&key, |r| r.key)
    }

    /// Value stored under `key`.
    pub fn get(&self, key: u64) -> Option<&[u8]> {
        self.search(key)
            .ok()
            .map(|idx| self.records[idx].value.as_slice())
    }

    /// Inserts `record` at its sorted position, overwriting an equal key.
    pub fn put(&mut self, record: Record) -> LeafPut {
        match self.search(record.key) {
            Ok(idx) => {
                let old = std::mem::replace(&mut self.records[idx].value, record.value);
                LeafPut::Replaced(old)
            }
            Err(idx) => {
                self.records.insert(idx, record);
                LeafPut::Inserted
            }
        }
    }

    /// Splits off the upper half and returns it with its first key.
    ///
    /// With `n` records the lower `ceil(n/2)` stay here. The returned node takes
    /// over this node's sibling link; the caller points `next` at its new page.
    pub fn split(&mut self) -> (u64, LeafNode) {
        let keep = self.records.len().div_ceil(2);
        let upper = self.records.split_off(keep);
        let separator = upper[0].key;
        let right = LeafNode {
            records: upper,
            next: self.next.take(),
        };
        (separator, right)
    }

    /// First key in the node.
    pub fn first_key(&self) -> Option<u64> {
        self.records.first().map(|r| r.key)
    }

    /// Last key in the node.
    pub fn last_key(&self) -> Option<u64> {
        self.records.last().map(|r| r.key)
    }
}

/// Separator keys and child pages of a root or internal node.
///
/// `children.len() == keys.len() + 1`. Child `i` holds keys below `keys[i]`;
/// child `i + 1` holds keys at or above it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InternalNode {
    /// Separators in strictly ascending order.
    pub keys: Vec<u64>,
    /// Child page numbers.
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// Index of the child whose range contains `key`.
    pub fn child_index(&self, key: u64) -> usize {
        self.keys.partition_point(|sep| *sep <= key)
    }

    /// Child page whose range contains `key`.
    pub fn child_for(&self, key: u64) -> PageId {
        self.children[self.child_index(key)]
    }

    /// Inserts `separator` with `right` as the child directly after `child_idx`.
    pub fn insert_split(&mut self, child_idx: usize, separator: u64, right: PageId) {
        self.keys.insert(child_idx, separator);
        self.children.insert(child_idx + 1, right);
    }

    /// Splits an overfull node, promoting its middle separator.
    ///
    /// With `n` children the lower `ceil(n/2)` stay here. The promoted key is
    /// removed from both halves.
    pub fn split(&mut self) -> (u64, InternalNode) {
        let keep = self.children.len().div_ceil(2);
        let right_children = self.children.split_off(keep);
        let right_keys = self.keys.split_off(keep);
        let promoted = self.keys.pop().unwrap_or_default();
        let right = InternalNode {
            keys: right_keys,
            children: right_children,
        };
        (promoted, right)
    }

    /// Number of children.
    pub fn fanout(&self) -> usize {
        self.children.len()
    }
}

/// Decoded role of one page in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Root that is also the only leaf.
    LonelyRoot(LeafNode),
    /// Root with children.
    Root(InternalNode),
    /// Non-root internal node.
    Internal(InternalNode),
    /// Non-root leaf.
    Leaf(LeafNode),
}

impl Node {
    /// An empty root for a brand-new tree.
    pub fn lonely_root(config: &TreeConfig) -> Node {
        Node::LonelyRoot(LeafNode {
            records: Vec::with_capacity(config.max_leaf_entries() + 1),
            next: None,
        })
    }

    /// A root over exactly two children separated by `separator`.
    pub fn root(config: &TreeConfig, left: PageId, separator: u64, right: PageId) -> Node {
        let mut keys = Vec::with_capacity(config.max_children());
        keys.push(separator);
        let mut children = Vec::with_capacity(config.max_children() + 1);
        children.extend([left, right]);
        Node::Root(InternalNode { keys, children })
    }

    /// Whether this node holds records rather than children.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::LonelyRoot(_) | Node::Leaf(_))
    }

    /// Whether this node is allowed only on the root page.
    pub fn is_root(&self) -> bool {
        matches!(self, Node::LonelyRoot(_) | Node::Root(_))
    }

    /// Number of valid entries: records for leaves, separators for internal nodes.
    pub fn entry_count(&self) -> usize {
        match self {
            Node::LonelyRoot(leaf) | Node::Leaf(leaf) => leaf.records.len(),
            Node::Root(inner) | Node::Internal(inner) => inner.keys.len(),
        }
    }

    /// Short variant name for logs and reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::LonelyRoot(_) => "lonely_root",
            Node::Root(_) => "root",
            Node::Internal(_) => "internal",
            Node::Leaf(_) => "leaf",
        }
    }
}
