use std::sync::Arc;

use tracing::{debug, warn};

use crate::primitives::pager::Pager;
use crate::types::{PageId, Result, TreeError};

use super::config::TreeConfig;
use super::node::{InternalNode, LeafNode, Node};
use super::options::TreeOptions;
use super::page;
use super::stats::{BTreeStats, BTreeStatsSnapshot};

mod read;
mod write;

/// Disk-backed B+ tree over numeric keys and bounded byte values.
///
/// Every operation re-reads the pages it needs from the pager and writes back
/// every page it changes before returning, so no node state outlives a call.
/// The handle is single-writer; callers needing concurrency must serialize
/// access externally.
pub struct BPlusTree {
    pub(super) pager: Pager,
    pub(super) config: TreeConfig,
    pub(super) root: PageId,
    pub(super) stats: Arc<BTreeStats>,
}

/// One internal node visited on the way down to a leaf.
pub(super) struct PathEntry {
    pub(super) page_id: PageId,
    pub(super) node: InternalNode,
    pub(super) child_idx: usize,
}

/// Result of walking from the root to the leaf responsible for a key.
pub(super) struct Descent {
    pub(super) path: Vec<PathEntry>,
    pub(super) leaf_id: PageId,
    pub(super) leaf: LeafNode,
    pub(super) leaf_is_root: bool,
}

impl BPlusTree {
    /// Opens the tree described by `options`, creating it if the target is empty.
    pub fn open(options: &TreeOptions) -> Result<Self> {
        let config = TreeConfig::from_options(options)?;
        let pager = match &options.filename {
            Some(path) => Pager::open(path, config.pager_options())?,
            None => Pager::in_memory(config.pager_options())?,
        };
        Self::with_pager(pager, config)
    }

    /// Opens a tree over an already-open pager.
    ///
    /// If page 0 records no root, an empty root leaf is allocated and recorded.
    pub fn with_pager(mut pager: Pager, config: TreeConfig) -> Result<Self> {
        let meta = pager.meta();
        let expected = config.pager_options();
        if meta.page_size != expected.page_size {
            return Err(TreeError::Config("pager page_size differs from tree config"));
        }
        if meta.order != expected.order {
            return Err(TreeError::Config("pager order differs from tree config"));
        }
        if meta.key_size != expected.key_size {
            return Err(TreeError::Config("pager key_size differs from tree config"));
        }
        if meta.value_size != expected.value_size {
            return Err(TreeError::Config("pager value_size differs from tree config"));
        }
        let root = match pager.root_page() {
            Some(root) => root,
            None => {
                let root = pager.allocate_page()?;
                let data = page::encode(&config, &Node::lonely_root(&config), root)?;
                pager.write_page(root, &data)?;
                pager.set_root(root)?;
                debug!(root = root.0, "btree.create_root");
                root
            }
        };
        let tree = Self {
            pager,
            config,
            root,
            stats: Arc::new(BTreeStats::default()),
        };
        let root_node = tree.load(root)?;
        if !root_node.is_root() {
            warn!(root = root.0, kind = root_node.kind_name(), "btree.open.bad_root");
            return Err(TreeError::corrupt(root, "root page holds a non-root node"));
        }
        debug!(
            backing = %tree.pager.backing(),
            meta = %tree.pager.meta(),
            kind = root_node.kind_name(),
            "btree.open"
        );
        Ok(tree)
    }

    /// The derived configuration this tree runs with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Current root page.
    pub fn root_page(&self) -> PageId {
        self.root
    }

    /// Read access to the underlying page store.
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Access the live statistics counters for this tree.
    pub fn stats(&self) -> Arc<BTreeStats> {
        Arc::clone(&self.stats)
    }

    /// Snapshot the current statistics counters.
    pub fn stats_snapshot(&self) -> BTreeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Decodes the node stored on `page_id`.
    pub fn load(&self, page_id: PageId) -> Result<Node> {
        let data = self.pager.read_page(page_id)?;
        page::decode(&self.config, &data, page_id)
    }

    /// Flushes written pages to the durable medium without closing.
    pub fn flush(&self) -> Result<()> {
        self.pager.sync()
    }

    /// Flushes and releases the backing store.
    pub fn close(self) -> Result<()> {
        self.stats.emit_tracing();
        self.pager.close()
    }

    pub(super) fn store(&mut self, page_id: PageId, node: &Node) -> Result<()> {
        let data = page::encode(&self.config, node, page_id)?;
        self.pager.write_page(page_id, &data)
    }
}
