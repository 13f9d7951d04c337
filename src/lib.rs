//! Embedded disk-backed B+ tree.
//!
//! A [`BPlusTree`] maps `u64` keys to bounded byte values. Nodes live one per
//! fixed-size page in a file or in memory; page 0 records the geometry and the
//! current root so a file can be reopened later.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::btree::{BPlusTree, Cursor, TreeConfig, TreeOptions, VerifyReport};
pub use types::{PageId, Result, TreeError};
