//! Tree storage built on top of the page store.

/// B+ tree nodes, codec and engine.
pub mod btree;
