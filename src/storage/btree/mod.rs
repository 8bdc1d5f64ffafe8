#![forbid(unsafe_code)]

//! Single-table B+ tree over fixed-size pages: leaves hold rows, internal
//! nodes route by separator key, and the root always lives on page 0.

/// Page format and node accessors.
pub mod page;

mod cursor;
mod dump;
mod tree;
mod verify;

pub use cursor::Cursor;
pub use dump::TreeShape;
pub use tree::BTree;
pub use verify::{VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity};
