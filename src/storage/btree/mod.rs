#![forbid(unsafe_code)]

//! Disk-backed B+ tree over fixed-width numeric keys.
//!
//! Nodes are decoded from pages on demand and written back after every
//! mutation; nothing is cached between calls.

/// Derived node capacities for a page geometry.
pub mod config;
/// Tree construction options, loadable from TOML.
pub mod options;
/// B+ tree page format and operations.
pub mod page;

mod cursor;
mod node;
mod stats;
mod tree;
mod verify;

pub use config::TreeConfig;
pub use cursor::Cursor;
pub use node::{key_fits, InternalNode, LeafNode, LeafPut, Node, Record};
pub use options::TreeOptions;
pub use stats::{BTreeStats, BTreeStatsSnapshot};
pub use tree::BPlusTree;
pub use verify::VerifyReport;
