//! Low-level primitives the tree is built on.
//!
//! Positioned I/O over a file or an in-memory buffer, and the pager that maps
//! page numbers onto it.

/// I/O abstractions and utilities.
///
/// Interfaces for reading/writing data on a file or a process-local buffer.
pub mod io;

/// Paging subsystem.
///
/// Page allocation, raw page reads/writes and the page-0 metadata block.
pub mod pager;
