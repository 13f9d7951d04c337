//! Fixed-slot node page format.
//!
//! ```text
//! 0      1          2       4          8       16
//! +------+----------+-------+----------+-------+---------------------------+
//! | tag  | reserved | count | reserved | link  | count x fixed-width entry |
//! +------+----------+-------+----------+-------+---------------------------+
//! ```
//!
//! Leaf entries are `key | used_len:u16 | value slot`; `link` is the right
//! sibling (0 = none). Internal entries are `separator | child:u64`; `link` is
//! the leftmost child. All integers are big-endian. Unused slot space is zero.

use std::convert::TryFrom;

use crate::types::{PageId, Result, TreeError};

use super::config::{TreeConfig, NODE_HEADER_LEN, PAGE_ID_LEN, VALUE_LEN_PREFIX};
use super::node::{InternalNode, LeafNode, Node, Record};

const TAG_OFFSET: usize = 0;
const COUNT_OFFSET: usize = 2;
const LINK_OFFSET: usize = 8;

/// One-byte tag stored at the start of every node page.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeTag {
    /// Root page that is also a leaf.
    LonelyRoot = 1,
    /// Root page with children.
    Root = 2,
    /// Non-root internal page.
    Internal = 3,
    /// Non-root leaf page.
    Leaf = 4,
}

impl NodeTag {
    /// Raw byte value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Tag for a decoded node.
    pub fn of(node: &Node) -> Self {
        match node {
            Node::LonelyRoot(_) => NodeTag::LonelyRoot,
            Node::Root(_) => NodeTag::Root,
            Node::Internal(_) => NodeTag::Internal,
            Node::Leaf(_) => NodeTag::Leaf,
        }
    }
}

impl TryFrom<u8> for NodeTag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(NodeTag::LonelyRoot),
            2 => Ok(NodeTag::Root),
            3 => Ok(NodeTag::Internal),
            4 => Ok(NodeTag::Leaf),
            other => Err(other),
        }
    }
}

/// Decodes the node stored in `data`, which must be exactly one page.
pub fn decode(config: &TreeConfig, data: &[u8], page: PageId) -> Result<Node> {
    if data.len() != config.page_size() {
        return Err(TreeError::SizeMismatch {
            expected: config.page_size(),
            actual: data.len(),
        });
    }
    let tag = NodeTag::try_from(data[TAG_OFFSET])
        .map_err(|_| TreeError::corrupt(page, "unknown node tag"))?;
    let count = u16::from_be_bytes([data[COUNT_OFFSET], data[COUNT_OFFSET + 1]]) as usize;
    let link = read_u64(data, LINK_OFFSET);
    match tag {
        NodeTag::LonelyRoot => {
            if link != 0 {
                return Err(TreeError::corrupt(page, "lonely root has a sibling link"));
            }
            decode_leaf(config, data, page, count, None).map(Node::LonelyRoot)
        }
        NodeTag::Leaf => {
            let next = (link != 0).then_some(PageId(link));
            decode_leaf(config, data, page, count, next).map(Node::Leaf)
        }
        NodeTag::Root => decode_internal(config, data, page, count, link).map(Node::Root),
        NodeTag::Internal => {
            decode_internal(config, data, page, count, link).map(Node::Internal)
        }
    }
}

/// Encodes `node` into a fresh page-sized buffer.
///
/// Fails with [`TreeError::SizeMismatch`] when the node holds more entries than
/// its page can, which only happens if a caller skipped a split, and with
/// [`TreeError::CorruptPage`] naming `page` when an internal node's children
/// and separators disagree.
pub fn encode(config: &TreeConfig, node: &Node, page: PageId) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; config.page_size()];
    buf[TAG_OFFSET] = NodeTag::of(node).as_u8();
    match node {
        Node::LonelyRoot(leaf) => encode_leaf(config, leaf, None, &mut buf)?,
        Node::Leaf(leaf) => encode_leaf(config, leaf, leaf.next, &mut buf)?,
        Node::Root(inner) | Node::Internal(inner) => {
            encode_internal(config, inner, page, &mut buf)?
        }
    }
    Ok(buf)
}

/// Writes `key` big-endian into `dst`, left-padded with zeros.
///
/// `dst` must be `key_size` bytes and the key must already be known to fit.
pub fn encode_key(key: u64, dst: &mut [u8]) {
    dst.fill(0);
    let bytes = key.to_be_bytes();
    if dst.len() >= bytes.len() {
        let pad = dst.len() - bytes.len();
        dst[pad..].copy_from_slice(&bytes);
    } else {
        let skip = bytes.len() - dst.len();
        dst.copy_from_slice(&bytes[skip..]);
    }
}

/// Reads a key written by [`encode_key`].
pub fn decode_key(src: &[u8], page: PageId) -> Result<u64> {
    let (pad, tail) = src.split_at(src.len().saturating_sub(8));
    if pad.iter().any(|b| *b != 0) {
        return Err(TreeError::corrupt(page, "key exceeds 64 bits"));
    }
    Ok(tail.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn decode_leaf(
    config: &TreeConfig,
    data: &[u8],
    page: PageId,
    count: usize,
    next: Option<PageId>,
) -> Result<LeafNode> {
    if count > config.max_leaf_entries() {
        return Err(TreeError::corrupt(page, "leaf entry count exceeds capacity"));
    }
    let key_size = config.key_size();
    let width = config.leaf_entry_len();
    let mut records = Vec::with_capacity(count + 1);
    for idx in 0..count {
        let entry = &data[NODE_HEADER_LEN + idx * width..NODE_HEADER_LEN + (idx + 1) * width];
        let key = decode_key(&entry[..key_size], page)?;
        let len_at = key_size;
        let used = u16::from_be_bytes([entry[len_at], entry[len_at + 1]]) as usize;
        if used > config.value_size() {
            return Err(TreeError::corrupt(page, "value length exceeds value_size"));
        }
        let value_at = len_at + VALUE_LEN_PREFIX;
        if let Some(prev) = records.last().map(|r: &Record| r.key) {
            if key <= prev {
                return Err(TreeError::corrupt(page, "leaf keys not strictly ascending"));
            }
        }
        records.push(Record {
            key,
            value: entry[value_at..value_at + used].to_vec(),
        });
    }
    Ok(LeafNode { records, next })
}

fn decode_internal(
    config: &TreeConfig,
    data: &[u8],
    page: PageId,
    count: usize,
    leftmost: u64,
) -> Result<InternalNode> {
    if count == 0 {
        return Err(TreeError::corrupt(page, "internal node without separators"));
    }
    if count + 1 > config.max_children() {
        return Err(TreeError::corrupt(page, "internal child count exceeds capacity"));
    }
    if leftmost == 0 {
        return Err(TreeError::corrupt(page, "child pointer to metadata page"));
    }
    let key_size = config.key_size();
    let width = config.internal_entry_len();
    let mut keys = Vec::with_capacity(count + 1);
    let mut children = Vec::with_capacity(count + 2);
    children.push(PageId(leftmost));
    for idx in 0..count {
        let at = NODE_HEADER_LEN + idx * width;
        let key = decode_key(&data[at..at + key_size], page)?;
        if keys.last().is_some_and(|prev| key <= *prev) {
            return Err(TreeError::corrupt(
                page,
                "separator keys not strictly ascending",
            ));
        }
        let child = read_u64(data, at + key_size);
        if child == 0 {
            return Err(TreeError::corrupt(page, "child pointer to metadata page"));
        }
        keys.push(key);
        children.push(PageId(child));
    }
    Ok(InternalNode { keys, children })
}

fn encode_leaf(
    config: &TreeConfig,
    leaf: &LeafNode,
    next: Option<PageId>,
    buf: &mut [u8],
) -> Result<()> {
    let count = leaf.records.len();
    if count > config.max_leaf_entries() {
        return Err(overflow(config, NODE_HEADER_LEN + count * config.leaf_entry_len()));
    }
    write_count(buf, count);
    write_u64(buf, LINK_OFFSET, next.map_or(0, |id| id.0));
    let key_size = config.key_size();
    let width = config.leaf_entry_len();
    for (idx, record) in leaf.records.iter().enumerate() {
        if record.value.len() > config.value_size() {
            return Err(TreeError::ValueTooLarge {
                len: record.value.len(),
                value_size: config.value_size(),
            });
        }
        let entry = &mut buf[NODE_HEADER_LEN + idx * width..NODE_HEADER_LEN + (idx + 1) * width];
        encode_key(record.key, &mut entry[..key_size]);
        // Checked against value_size, which TreeConfig bounds to u16.
        let used = record.value.len() as u16;
        entry[key_size..key_size + VALUE_LEN_PREFIX].copy_from_slice(&used.to_be_bytes());
        let value_at = key_size + VALUE_LEN_PREFIX;
        entry[value_at..value_at + record.value.len()].copy_from_slice(&record.value);
    }
    Ok(())
}

fn encode_internal(
    config: &TreeConfig,
    inner: &InternalNode,
    page: PageId,
    buf: &mut [u8],
) -> Result<()> {
    let count = inner.keys.len();
    if inner.children.len() != count + 1 {
        return Err(TreeError::corrupt(
            page,
            "internal node children must outnumber separators by one",
        ));
    }
    if inner.children.len() > config.max_children() {
        return Err(overflow(
            config,
            NODE_HEADER_LEN + count * config.internal_entry_len(),
        ));
    }
    write_count(buf, count);
    write_u64(buf, LINK_OFFSET, inner.children[0].0);
    let key_size = config.key_size();
    let width = config.internal_entry_len();
    for (idx, (key, child)) in inner.keys.iter().zip(&inner.children[1..]).enumerate() {
        let at = NODE_HEADER_LEN + idx * width;
        encode_key(*key, &mut buf[at..at + key_size]);
        write_u64(buf, at + key_size, child.0);
    }
    Ok(())
}

fn overflow(config: &TreeConfig, needed: usize) -> TreeError {
    TreeError::SizeMismatch {
        expected: config.page_size(),
        actual: needed.max(config.page_size() + 1),
    }
}

fn write_count(buf: &mut [u8], count: usize) {
    // Capacities are capped at u16::MAX by TreeConfig.
    buf[COUNT_OFFSET..COUNT_OFFSET + 2].copy_from_slice(&(count as u16).to_be_bytes());
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; PAGE_ID_LEN];
    raw.copy_from_slice(&data[at..at + PAGE_ID_LEN]);
    u64::from_be_bytes(raw)
}

fn write_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + PAGE_ID_LEN].copy_from_slice(&value.to_be_bytes());
}
