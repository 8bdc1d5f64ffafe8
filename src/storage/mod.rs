//! Table storage: the row format, the page layout and the B+ tree that ties
//! them to a pager.

/// B+ tree over table pages.
pub mod btree;

/// Page size and derived capacity constants.
pub mod layout;

/// Fixed-width row encoding.
pub mod row;

mod table;

pub use btree::{
    BTree, Cursor, TreeShape, VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity,
};
pub use layout::{Layout, LayoutConstants, PAGE_SIZE};
pub use row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, ROW_SIZE};
pub use table::{Table, TableOptions};
