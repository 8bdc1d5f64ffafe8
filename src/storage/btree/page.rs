use crate::storage::row::ROW_SIZE;
use crate::types::{PageId, Result, StoreError};

const NODE_TYPE_SIZE: usize = 1;
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_SIZE: usize = 1;
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
// Reserved parent pointer; written as zero and never read.
const PARENT_POINTER_SIZE: usize = 4;

/// Header bytes shared by leaf and internal nodes (type, root flag, reserved parent).
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = 4;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;

/// Full leaf header length; cells start here.
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

/// Width of a leaf cell key.
pub const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_SIZE;
const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + ROW_SIZE;

const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;

/// Full internal header length; cells start here.
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;

/// Width of an internal cell (child page + key).
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// Node type tag stored in the first byte of every page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Routing node holding child pointers and separator keys.
    Internal = 0,
    /// Node holding rows.
    Leaf = 1,
}

impl NodeKind {
    /// Converts a tag byte to a node kind.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Internal),
            1 => Ok(Self::Leaf),
            _ => Err(StoreError::Corruption("unknown node type tag")),
        }
    }
}

/// Reads the type tag of `page`.
pub fn node_kind(page: &[u8]) -> Result<NodeKind> {
    NodeKind::from_u8(page[NODE_TYPE_OFFSET])
}

fn set_node_kind(page: &mut [u8], kind: NodeKind) {
    page[NODE_TYPE_OFFSET] = kind as u8;
}

/// Whether the root flag of `page` is set.
pub fn is_root(page: &[u8]) -> bool {
    page[IS_ROOT_OFFSET] != 0
}

/// Sets or clears the root flag of `page`.
pub fn set_root(page: &mut [u8], root: bool) {
    page[IS_ROOT_OFFSET] = u8::from(root);
}

/// Highest key stored in the node.
///
/// For internal nodes this is the last separator, not the true maximum of the
/// rightmost subtree. That only holds while internal nodes never split.
pub fn max_key(page: &[u8]) -> Result<u32> {
    match node_kind(page)? {
        NodeKind::Leaf => {
            let leaf = LeafNode::new(page);
            match leaf.num_cells() {
                0 => Err(StoreError::Corruption("max key of an empty leaf")),
                n => Ok(leaf.key(n - 1)),
            }
        }
        NodeKind::Internal => {
            let node = InternalNode::new(page);
            match node.num_keys() {
                0 => Err(StoreError::Corruption("max key of an internal node without keys")),
                n => Ok(node.key(n - 1)),
            }
        }
    }
}

/// Leaf view over a page buffer.
pub struct LeafNode<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    /// Wraps `buf` without checking its type tag.
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    fn page(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Number of cells stored.
    pub fn num_cells(&self) -> u32 {
        read_u32(self.page(), LEAF_NODE_NUM_CELLS_OFFSET)
    }

    /// Right sibling in key order, if any.
    pub fn next_leaf(&self) -> Option<PageId> {
        decode_page_id(read_u32(self.page(), LEAF_NODE_NEXT_LEAF_OFFSET))
    }

    /// Raw bytes of cell `cell` (key followed by row).
    pub fn cell(&self, cell: u32) -> &[u8] {
        let start = leaf_cell_offset(cell);
        &self.page()[start..start + LEAF_NODE_CELL_SIZE]
    }

    /// Key of cell `cell`.
    pub fn key(&self, cell: u32) -> u32 {
        read_u32(self.page(), leaf_cell_offset(cell))
    }

    /// Serialized row of cell `cell`.
    pub fn value(&self, cell: u32) -> &[u8] {
        let start = leaf_cell_offset(cell) + LEAF_NODE_VALUE_OFFSET;
        &self.page()[start..start + ROW_SIZE]
    }

    /// Index of `key`, or the index it would be inserted at.
    pub fn search(&self, key: u32) -> u32 {
        let mut lo = 0;
        let mut hi = self.num_cells();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mid_key = self.key(mid);
            if mid_key == key {
                return mid;
            }
            if key < mid_key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    fn page_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    /// Resets the page to an empty, non-root leaf with no sibling.
    pub fn initialize(&mut self) {
        let page = self.page_mut();
        page.fill(0);
        set_node_kind(page, NodeKind::Leaf);
        set_root(page, false);
    }

    /// Stores the cell count.
    pub fn set_num_cells(&mut self, count: u32) {
        write_u32(self.page_mut(), LEAF_NODE_NUM_CELLS_OFFSET, count);
    }

    /// Stores the right sibling pointer.
    pub fn set_next_leaf(&mut self, next: Option<PageId>) {
        write_u32(self.page_mut(), LEAF_NODE_NEXT_LEAF_OFFSET, encode_page_id(next));
    }

    /// Stores the key of cell `cell`.
    pub fn set_key(&mut self, cell: u32, key: u32) {
        write_u32(self.page_mut(), leaf_cell_offset(cell), key);
    }

    /// Mutable bytes of cell `cell`.
    pub fn cell_mut(&mut self, cell: u32) -> &mut [u8] {
        let start = leaf_cell_offset(cell);
        &mut self.page_mut()[start..start + LEAF_NODE_CELL_SIZE]
    }

    /// Mutable serialized row of cell `cell`.
    pub fn value_mut(&mut self, cell: u32) -> &mut [u8] {
        let start = leaf_cell_offset(cell) + LEAF_NODE_VALUE_OFFSET;
        &mut self.page_mut()[start..start + ROW_SIZE]
    }

    /// Moves cells `[from, count)` one slot to the right.
    pub fn shift_right(&mut self, from: u32, count: u32) {
        if from >= count {
            return;
        }
        let start = leaf_cell_offset(from);
        let end = leaf_cell_offset(count);
        self.page_mut()
            .copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
    }
}

impl<'a> LeafNode<&'a [u8]> {
    /// Row bytes of `cell`, borrowed for as long as the page.
    pub fn into_value(self, cell: u32) -> &'a [u8] {
        let start = leaf_cell_offset(cell) + LEAF_NODE_VALUE_OFFSET;
        &self.buf[start..start + ROW_SIZE]
    }
}

impl<'a> LeafNode<&'a mut [u8]> {
    /// Mutable row bytes of `cell`, borrowed for as long as the page.
    pub fn into_value_mut(self, cell: u32) -> &'a mut [u8] {
        let start = leaf_cell_offset(cell) + LEAF_NODE_VALUE_OFFSET;
        &mut self.buf[start..start + ROW_SIZE]
    }
}

/// Internal node view over a page buffer.
pub struct InternalNode<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    /// Wraps `buf` without checking its type tag.
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    fn page(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Number of separator keys.
    pub fn num_keys(&self) -> u32 {
        read_u32(self.page(), INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    /// Child holding every key above the last separator.
    pub fn right_child(&self) -> PageId {
        PageId(read_u32(self.page(), INTERNAL_NODE_RIGHT_CHILD_OFFSET))
    }

    /// Child `idx`; `idx == num_keys` is the rightmost child.
    pub fn child(&self, idx: u32) -> Result<PageId> {
        let num_keys = self.num_keys();
        if idx > num_keys {
            return Err(StoreError::Corruption("child index past key count"));
        }
        if idx == num_keys {
            return Ok(self.right_child());
        }
        Ok(PageId(read_u32(self.page(), internal_cell_offset(idx))))
    }

    /// Separator key `idx`: the maximum key under `child(idx)`.
    pub fn key(&self, idx: u32) -> u32 {
        read_u32(
            self.page(),
            internal_cell_offset(idx) + INTERNAL_NODE_CHILD_SIZE,
        )
    }

    /// Index of the first child whose subtree maximum is >= `key`.
    pub fn search(&self, key: u32) -> u32 {
        let mut lo = 0;
        let mut hi = self.num_keys();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    fn page_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    /// Resets the page to an internal node without keys.
    pub fn initialize(&mut self) {
        let page = self.page_mut();
        page.fill(0);
        set_node_kind(page, NodeKind::Internal);
        set_root(page, false);
    }

    /// Stores the key count.
    pub fn set_num_keys(&mut self, count: u32) {
        write_u32(self.page_mut(), INTERNAL_NODE_NUM_KEYS_OFFSET, count);
    }

    /// Stores the rightmost child pointer.
    pub fn set_right_child(&mut self, child: PageId) {
        write_u32(self.page_mut(), INTERNAL_NODE_RIGHT_CHILD_OFFSET, child.0);
    }

    /// Stores child `idx`; `idx == num_keys` writes the rightmost child.
    pub fn set_child(&mut self, idx: u32, child: PageId) -> Result<()> {
        let num_keys = self.num_keys();
        if idx > num_keys {
            return Err(StoreError::Corruption("child index past key count"));
        }
        if idx == num_keys {
            self.set_right_child(child);
        } else {
            write_u32(self.page_mut(), internal_cell_offset(idx), child.0);
        }
        Ok(())
    }

    /// Stores separator key `idx`.
    pub fn set_key(&mut self, idx: u32, key: u32) {
        write_u32(
            self.page_mut(),
            internal_cell_offset(idx) + INTERNAL_NODE_CHILD_SIZE,
            key,
        );
    }
}

fn leaf_cell_offset(cell: u32) -> usize {
    LEAF_NODE_HEADER_SIZE + cell as usize * LEAF_NODE_CELL_SIZE
}

fn internal_cell_offset(idx: u32) -> usize {
    INTERNAL_NODE_HEADER_SIZE + idx as usize * INTERNAL_NODE_CELL_SIZE
}

fn decode_page_id(raw: u32) -> Option<PageId> {
    if raw == 0 {
        None
    } else {
        Some(PageId(raw))
    }
}

fn encode_page_id(page: Option<PageId>) -> u32 {
    page.map(|p| p.0).unwrap_or(0)
}

fn read_u32(page: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        page[offset],
        page[offset + 1],
        page[offset + 2],
        page[offset + 3],
    ])
}

fn write_u32(page: &mut [u8], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
