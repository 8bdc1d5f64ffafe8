#![forbid(unsafe_code)]

//! The table handle: one file, one B+ tree keyed by row id.

use std::path::Path;

use tracing::{debug, info};

use crate::primitives::pager::{Pager, PagerOptions, PagerStats};
use crate::storage::btree::{BTree, Cursor, TreeShape, VerifyReport};
use crate::storage::layout::Layout;
use crate::storage::row::Row;
use crate::types::{Result, StoreError};

/// Options used when opening a table.
#[derive(Clone, Debug, Default)]
pub struct TableOptions {
    /// Page format; must match the one the file was written with.
    pub layout: Layout,
    /// Pager configuration.
    pub pager: PagerOptions,
}

/// An open table file.
///
/// Changes live in memory until [`Table::close`]; dropping a table without
/// closing it discards them.
pub struct Table {
    tree: BTree,
}

impl Table {
    /// Opens or creates the table at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, TableOptions::default())
    }

    /// Opens or creates the table at `path`.
    pub fn open_with(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        let path = path.as_ref();
        let pager = Pager::open(path, options.layout.page_size, options.pager)?;
        let tree = BTree::open(pager, options.layout)?;
        info!(
            path = %path.display(),
            pages = tree.pager().num_pages(),
            "table.open"
        );
        Ok(Self { tree })
    }

    /// Writes every resident page back and closes the file.
    pub fn close(self) -> Result<()> {
        self.tree.into_pager().close()
    }

    /// Cursor at `key`, or where it would be inserted.
    pub fn find(&mut self, key: u32) -> Result<Cursor<'_>> {
        self.tree.find(key)
    }

    /// Cursor at the smallest key.
    pub fn start(&mut self) -> Result<Cursor<'_>> {
        self.tree.start()
    }

    /// Inserts `row` under its id, rejecting ids already present.
    pub fn insert_row(&mut self, row: &Row) -> Result<()> {
        let key = row.id;
        let mut cursor = self.tree.find(key)?;
        if cursor.key()? == Some(key) {
            debug!(key, "table.duplicate_key");
            return Err(StoreError::DuplicateKey(key));
        }
        cursor.insert(key, row)
    }

    /// Every row in ascending key order.
    pub fn rows(&mut self) -> Result<Vec<Row>> {
        let mut cursor = self.tree.start()?;
        let mut rows = Vec::new();
        while !cursor.is_end() {
            rows.push(cursor.row()?);
            cursor.advance()?;
        }
        Ok(rows)
    }

    /// Structure of the tree for the `.btree` dump.
    pub fn tree_shape(&mut self) -> Result<TreeShape> {
        self.tree.shape()
    }

    /// Structural check of the whole tree.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        self.tree.verify()
    }

    /// Pager cache counters.
    pub fn pager_stats(&self) -> PagerStats {
        self.tree.pager().stats()
    }

    /// Page format of this table.
    pub fn layout(&self) -> Layout {
        self.tree.layout()
    }
}
