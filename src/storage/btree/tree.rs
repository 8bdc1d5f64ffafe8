use std::cmp::Ordering;

use tracing::debug;

use crate::primitives::pager::Pager;
use crate::storage::layout::Layout;
use crate::storage::row::Row;
use crate::types::{PageId, Result, StoreError};

use super::cursor::Cursor;
use super::page::{self, InternalNode, LeafNode, NodeKind};

/// Leaf position reached by a key descent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Position {
    pub(crate) page: PageId,
    pub(crate) cell: u32,
    pub(crate) end_of_table: bool,
}

/// The single-table B+ tree. Page 0 is always the root.
pub struct BTree {
    pub(super) pager: Pager,
    pub(super) layout: Layout,
}

/// A cell waiting to be placed during a split.
struct Incoming<'a> {
    cell: u32,
    key: u32,
    row: &'a Row,
}

impl BTree {
    /// Wraps `pager`, writing an empty root leaf when the file has no pages.
    pub fn open(mut pager: Pager, layout: Layout) -> Result<Self> {
        if pager.page_size() != layout.page_size {
            return Err(StoreError::Invalid("pager and layout disagree on page size"));
        }
        if pager.num_pages() == 0 {
            let root = pager.get_page(PageId::ROOT)?;
            LeafNode::new(&mut *root).initialize();
            page::set_root(root, true);
            debug!("btree.init_root");
        }
        Ok(Self { pager, layout })
    }

    /// Layout the tree was opened with.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Underlying pager.
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    #[cfg(test)]
    pub(crate) fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    /// Releases the pager so it can be closed.
    pub fn into_pager(self) -> Pager {
        self.pager
    }

    /// Cursor at `key`, or where `key` would be inserted.
    pub fn find(&mut self, key: u32) -> Result<Cursor<'_>> {
        let position = self.locate(key)?;
        Ok(Cursor::new(self, position))
    }

    /// Cursor at the first row in key order.
    pub fn start(&mut self) -> Result<Cursor<'_>> {
        self.find(0)
    }

    pub(crate) fn locate(&mut self, key: u32) -> Result<Position> {
        let mut page_id = PageId::ROOT;
        for _ in 0..=self.pager.max_pages() {
            let buf = self.pager.get_page(page_id)?;
            match page::node_kind(buf)? {
                NodeKind::Leaf => {
                    let leaf = LeafNode::new(&*buf);
                    return Ok(Position {
                        page: page_id,
                        cell: leaf.search(key),
                        end_of_table: leaf.num_cells() == 0,
                    });
                }
                NodeKind::Internal => {
                    let node = InternalNode::new(&*buf);
                    page_id = node.child(node.search(key))?;
                }
            }
        }
        Err(StoreError::Corruption("tree descent exceeded page capacity"))
    }

    /// Writes (`key`, `row`) at `cell` of leaf `page_id`, splitting a full leaf.
    ///
    /// Duplicate keys are not detected here.
    pub(crate) fn insert(&mut self, page_id: PageId, cell: u32, key: u32, row: &Row) -> Result<()> {
        let max_cells = self.max_cells();
        let buf = self.pager.get_page(page_id)?;
        if page::node_kind(buf)? != NodeKind::Leaf {
            return Err(StoreError::Invalid("insert target is not a leaf"));
        }
        let mut leaf = LeafNode::new(buf);
        let num_cells = leaf.num_cells();
        if cell > num_cells {
            return Err(StoreError::Invalid("insert position past the last cell"));
        }
        if num_cells >= max_cells {
            return self.split_and_insert(page_id, Incoming { cell, key, row });
        }
        leaf.shift_right(cell, num_cells);
        leaf.set_num_cells(num_cells + 1);
        leaf.set_key(cell, key);
        row.serialize_into(leaf.value_mut(cell))
    }

    fn split_and_insert(&mut self, old_id: PageId, incoming: Incoming<'_>) -> Result<()> {
        let snapshot = self.pager.get_page(old_id)?.to_vec();
        if !page::is_root(&snapshot) {
            return Err(StoreError::SplitNotImplemented(old_id));
        }
        // The right leaf and the relocated left leaf.
        self.pager.ensure_capacity(2)?;

        let old_leaf = LeafNode::new(&snapshot[..]);
        let left_count = self.layout.leaf_left_split_count as u32;
        let right_count = self.layout.leaf_right_split_count as u32;
        let total = left_count + right_count;
        let new_id = self.pager.next_unused_page();

        let mut right = LeafNode::new(self.pager.get_page(new_id)?);
        right.initialize();
        for slot in left_count..total {
            place_slot(&mut right, slot - left_count, slot, &incoming, &old_leaf)?;
        }
        right.set_num_cells(right_count);
        right.set_next_leaf(old_leaf.next_leaf());

        let mut left = LeafNode::new(self.pager.get_page(old_id)?);
        for slot in 0..left_count {
            place_slot(&mut left, slot, slot, &incoming, &old_leaf)?;
        }
        left.set_num_cells(left_count);
        left.set_next_leaf(Some(new_id));

        debug!(
            page = old_id.0,
            new_page = new_id.0,
            left = left_count,
            right = right_count,
            "btree.split_leaf"
        );
        self.create_new_root(new_id)
    }

    fn create_new_root(&mut self, right_id: PageId) -> Result<()> {
        let root_bytes = self.pager.get_page(PageId::ROOT)?.to_vec();
        let left_id = self.pager.next_unused_page();
        let left = self.pager.get_page(left_id)?;
        left.copy_from_slice(&root_bytes);
        page::set_root(left, false);
        let left_max = page::max_key(left)?;

        let root = self.pager.get_page(PageId::ROOT)?;
        let mut node = InternalNode::new(&mut *root);
        node.initialize();
        node.set_num_keys(1);
        node.set_child(0, left_id)?;
        node.set_key(0, left_max);
        node.set_right_child(right_id);
        page::set_root(root, true);

        debug!(
            left = left_id.0,
            right = right_id.0,
            key = left_max,
            "btree.new_root"
        );
        Ok(())
    }

    pub(super) fn max_cells(&self) -> u32 {
        self.layout.leaf_max_cells as u32
    }
}

fn place_slot<B>(
    dest: &mut LeafNode<B>,
    dest_cell: u32,
    slot: u32,
    incoming: &Incoming<'_>,
    old: &LeafNode<&[u8]>,
) -> Result<()>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    match slot.cmp(&incoming.cell) {
        Ordering::Equal => {
            dest.set_key(dest_cell, incoming.key);
            incoming.row.serialize_into(dest.value_mut(dest_cell))
        }
        Ordering::Greater => {
            dest.cell_mut(dest_cell).copy_from_slice(old.cell(slot - 1));
            Ok(())
        }
        Ordering::Less => {
            dest.cell_mut(dest_cell).copy_from_slice(old.cell(slot));
            Ok(())
        }
    }
}
