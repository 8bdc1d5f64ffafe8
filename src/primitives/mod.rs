//! Low-level primitives for building the storage engine.

/// Positioned file I/O.
pub mod io;

/// Page cache over the table file.
pub mod pager;
