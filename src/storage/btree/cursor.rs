use crate::storage::row::Row;
use crate::types::{PageId, Result, StoreError};

use super::page::LeafNode;
use super::tree::{BTree, Position};

/// A position inside a leaf of the tree.
///
/// The cursor borrows the tree mutably, so at most one exists at a time and
/// it can insert at its own position.
pub struct Cursor<'t> {
    tree: &'t mut BTree,
    page: PageId,
    cell: u32,
    end_of_table: bool,
}

impl<'t> Cursor<'t> {
    pub(super) fn new(tree: &'t mut BTree, position: Position) -> Self {
        Self {
            tree,
            page: position.page,
            cell: position.cell,
            end_of_table: position.end_of_table,
        }
    }

    /// Leaf page the cursor points into.
    pub fn page(&self) -> PageId {
        self.page
    }

    /// Cell index inside the leaf.
    pub fn cell(&self) -> u32 {
        self.cell
    }

    /// True once the cursor has moved past the last row.
    pub fn is_end(&self) -> bool {
        self.end_of_table
    }

    /// Moves to the next cell, following the leaf chain at the end of a leaf.
    pub fn advance(&mut self) -> Result<()> {
        let leaf = LeafNode::new(&*self.tree.pager.get_page(self.page)?);
        self.cell += 1;
        if self.cell >= leaf.num_cells() {
            match leaf.next_leaf() {
                Some(next) => {
                    self.page = next;
                    self.cell = 0;
                }
                None => self.end_of_table = true,
            }
        }
        Ok(())
    }

    /// Serialized row bytes at the cursor.
    ///
    /// At `cell == num_cells` this is the unoccupied slot an insert would
    /// write, not a stored row.
    pub fn value(&mut self) -> Result<&[u8]> {
        self.check_slot()?;
        let buf = self.tree.pager.get_page(self.page)?;
        Ok(LeafNode::new(&*buf).into_value(self.cell))
    }

    /// Mutable serialized row bytes at the cursor.
    pub fn value_mut(&mut self) -> Result<&mut [u8]> {
        self.check_slot()?;
        let buf = self.tree.pager.get_page(self.page)?;
        Ok(LeafNode::new(buf).into_value_mut(self.cell))
    }

    /// Key stored at the cursor, if the cell is occupied.
    pub fn key(&mut self) -> Result<Option<u32>> {
        let leaf = LeafNode::new(&*self.tree.pager.get_page(self.page)?);
        if self.cell < leaf.num_cells() {
            Ok(Some(leaf.key(self.cell)))
        } else {
            Ok(None)
        }
    }

    /// Decoded row at the cursor.
    pub fn row(&mut self) -> Result<Row> {
        Row::deserialize(self.value()?)
    }

    /// Inserts (`key`, `row`) at the cursor position.
    pub fn insert(&mut self, key: u32, row: &Row) -> Result<()> {
        self.tree.insert(self.page, self.cell, key, row)
    }

    fn check_slot(&self) -> Result<()> {
        if self.cell >= self.tree.max_cells() {
            return Err(StoreError::Invalid("cursor is past the leaf capacity"));
        }
        Ok(())
    }
}
