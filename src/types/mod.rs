#![forbid(unsafe_code)]

//! Shared identifiers and the error taxonomy used by every layer.

use std::fmt;

/// Logical page number inside the backing store.
///
/// Page 0 always holds the tree metadata; nodes live on pages `1..`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct PageId(pub u64);

impl PageId {
    /// The metadata page.
    pub const META: PageId = PageId(0);

    /// Returns true for the metadata page, which doubles as the "no page" marker
    /// inside node links.
    pub const fn is_meta(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(value: u64) -> Self {
        PageId(value)
    }
}

/// Errors surfaced by the page store, the node codec and the tree engine.
#[derive(thiserror::Error, Debug)]
pub enum TreeError {
    /// The backing medium failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// The supplied configuration is invalid or disagrees with the persisted one.
    #[error("configuration: {0}")]
    Config(&'static str),
    /// A TOML options document could not be parsed.
    #[error("options: {0}")]
    Options(#[from] toml::de::Error),
    /// A page could not be decoded into a node or metadata block.
    #[error("corrupt page {page}: {reason}")]
    CorruptPage {
        /// Page that failed to decode.
        page: PageId,
        /// Short description of the violation.
        reason: &'static str,
    },
    /// A page number beyond the allocated extent was requested.
    #[error("page {page} out of range (extent {extent})")]
    OutOfRange {
        /// Requested page.
        page: PageId,
        /// Number of allocated pages.
        extent: u64,
    },
    /// A page write was attempted with a block of the wrong length.
    #[error("page size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Configured page size.
        expected: usize,
        /// Length of the rejected block.
        actual: usize,
    },
    /// A numeric key does not fit the configured key width.
    #[error("key {key} does not fit in {key_size} bytes")]
    KeyTooLarge {
        /// Rejected key.
        key: u64,
        /// Configured key width.
        key_size: usize,
    },
    /// A value is longer than the configured value slot.
    #[error("value of {len} bytes exceeds value_size {value_size}")]
    ValueTooLarge {
        /// Length of the rejected value.
        len: usize,
        /// Configured value width.
        value_size: usize,
    },
    /// A batch insert was not strictly ascending or overlapped existing keys.
    #[error("batch keys must be strictly ascending and above existing keys")]
    Unsorted,
}

impl TreeError {
    pub(crate) fn corrupt(page: PageId, reason: &'static str) -> Self {
        TreeError::CorruptPage { page, reason }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeError>;
