use crate::primitives::pager::{PagerOptions, META_LEN};
use crate::types::{Result, TreeError};

use super::options::TreeOptions;

/// Bytes at the start of every node page: tag, reserved, count, reserved, link.
pub const NODE_HEADER_LEN: usize = 16;
/// Width of a child page number inside internal nodes.
pub const PAGE_ID_LEN: usize = 8;
/// Width of the used-length prefix stored ahead of each value slot.
pub const VALUE_LEN_PREFIX: usize = 2;

const MAX_COUNT: usize = u16::MAX as usize;

/// Immutable tree geometry derived from the four persisted scalars.
///
/// Capacities are not stored on disk; they are recomputed identically on every
/// open from `page_size`, `order`, `key_size` and `value_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    page_size: usize,
    order: usize,
    key_size: usize,
    value_size: usize,
    max_leaf_entries: usize,
    max_children: usize,
}

impl TreeConfig {
    /// Validates the scalars and derives node capacities.
    pub fn new(page_size: usize, order: usize, key_size: usize, value_size: usize) -> Result<Self> {
        if order < 3 {
            return Err(TreeError::Config("order must be at least 3"));
        }
        if key_size == 0 {
            return Err(TreeError::Config("key_size must be non-zero"));
        }
        if value_size > u16::MAX as usize {
            return Err(TreeError::Config("value_size exceeds 65535 bytes"));
        }
        let wide = u32::MAX as usize;
        if page_size > wide || order > wide || key_size > wide {
            return Err(TreeError::Config("configuration scalar exceeds 32 bits"));
        }
        if page_size < META_LEN.max(NODE_HEADER_LEN) {
            return Err(TreeError::Config("page size smaller than page header"));
        }
        let usable = page_size - NODE_HEADER_LEN;
        let leaf_fit = usable / (key_size + VALUE_LEN_PREFIX + value_size);
        if leaf_fit < 2 {
            return Err(TreeError::Config(
                "page too small for two records of the configured sizes",
            ));
        }
        let internal_fit = usable / (key_size + PAGE_ID_LEN) + 1;
        if internal_fit < 3 {
            return Err(TreeError::Config(
                "page too small for three children of the configured key size",
            ));
        }
        Ok(Self {
            page_size,
            order,
            key_size,
            value_size,
            // The header count field is a u16.
            max_leaf_entries: (order - 1).min(leaf_fit).min(MAX_COUNT),
            max_children: order.min(internal_fit).min(MAX_COUNT),
        })
    }

    /// Derives the configuration for a set of user options.
    pub fn from_options(options: &TreeOptions) -> Result<Self> {
        Self::new(
            options.page_size as usize,
            options.order as usize,
            options.key_size as usize,
            options.value_size as usize,
        )
    }

    /// Bytes per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Requested branching order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Fixed key width.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Fixed value width.
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Most records a leaf (or lonely root) may hold once written.
    pub fn max_leaf_entries(&self) -> usize {
        self.max_leaf_entries
    }

    /// Fewest records a non-root leaf holds after any split.
    pub fn min_leaf_entries(&self) -> usize {
        self.max_leaf_entries.div_ceil(2)
    }

    /// Most children an internal (or root) node may hold once written.
    pub fn max_children(&self) -> usize {
        self.max_children
    }

    /// Fewest children a non-root internal node holds after any split.
    pub fn min_children(&self) -> usize {
        self.max_children.div_ceil(2)
    }

    /// Encoded width of one leaf record.
    pub fn leaf_entry_len(&self) -> usize {
        self.key_size + VALUE_LEN_PREFIX + self.value_size
    }

    /// Encoded width of one (separator, child) pair.
    pub fn internal_entry_len(&self) -> usize {
        self.key_size + PAGE_ID_LEN
    }

    pub(crate) fn pager_options(&self) -> PagerOptions {
        // Every scalar was bounds-checked against u32 in `new`.
        PagerOptions {
            page_size: self.page_size as u32,
            order: self.order as u32,
            key_size: self.key_size as u32,
            value_size: self.value_size as u32,
        }
    }
}
