//! rowbase: an embedded single-table record store.
//!
//! Rows of `(id, username, email)` live in a B+ tree keyed by id, stored in
//! fixed-size pages of one file. [`Table`] is the entry point; the [`cli`]
//! module drives a table from a line-oriented command loop.

#![warn(missing_docs)]

pub mod cli;
pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{Cursor, Layout, Row, Table, TableOptions};
pub use types::{PageId, Result, StoreError};
