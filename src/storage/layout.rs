#![forbid(unsafe_code)]

//! Size and capacity constants of the on-disk format, derived once from the
//! fixed row and key widths.

use std::fmt;

use serde::Serialize;

use crate::storage::btree::page::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_KEY_SIZE,
};
use crate::storage::row::ROW_SIZE;
use crate::types::{Result, StoreError};

/// Page size used by every table file.
pub const PAGE_SIZE: usize = 4096;

/// Immutable layout configuration shared by the pager, node codec and tree engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    /// Size of every page in bytes.
    pub page_size: usize,
    /// Serialized row width.
    pub row_size: usize,
    /// Width of one leaf cell (key + row).
    pub leaf_cell_size: usize,
    /// Bytes available for leaf cells after the header.
    pub leaf_space_for_cells: usize,
    /// Maximum number of cells a leaf holds.
    pub leaf_max_cells: usize,
    /// Cells kept by the left (old) leaf after a split.
    pub leaf_left_split_count: usize,
    /// Cells moved to the right (new) leaf after a split.
    pub leaf_right_split_count: usize,
}

impl Layout {
    /// Layout of the standard 4096-byte page format.
    pub const DEFAULT: Layout = Layout::new(PAGE_SIZE);

    const fn new(page_size: usize) -> Self {
        let leaf_cell_size = LEAF_NODE_KEY_SIZE + ROW_SIZE;
        let leaf_space_for_cells = page_size.saturating_sub(LEAF_NODE_HEADER_SIZE);
        let leaf_max_cells = leaf_space_for_cells / leaf_cell_size;
        let leaf_right_split_count = (leaf_max_cells + 1) / 2;
        let leaf_left_split_count = (leaf_max_cells + 1) - leaf_right_split_count;
        Self {
            page_size,
            row_size: ROW_SIZE,
            leaf_cell_size,
            leaf_space_for_cells,
            leaf_max_cells,
            leaf_left_split_count,
            leaf_right_split_count,
        }
    }

    /// Builds a layout for a non-standard page size.
    ///
    /// Files written with one page size cannot be read with another. The page
    /// must fit at least three leaf cells so that both halves of a split are
    /// non-empty and a split actually frees room.
    pub fn for_page_size(page_size: usize) -> Result<Self> {
        let layout = Self::new(page_size);
        if layout.leaf_max_cells < 3 {
            return Err(StoreError::Invalid("page size too small for three leaf cells"));
        }
        if u32::try_from(page_size).is_err() {
            return Err(StoreError::Invalid("page size exceeds u32"));
        }
        Ok(layout)
    }

    /// Values reported by the `.constants` diagnostic.
    pub fn constants(&self) -> LayoutConstants {
        LayoutConstants {
            row_size: self.row_size,
            common_node_header_size: COMMON_NODE_HEADER_SIZE,
            leaf_node_header_size: LEAF_NODE_HEADER_SIZE,
            leaf_node_cell_size: self.leaf_cell_size,
            leaf_node_space_for_cells: self.leaf_space_for_cells,
            leaf_node_max_cells: self.leaf_max_cells,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Snapshot of the layout constants, one line each when displayed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LayoutConstants {
    /// Serialized row width.
    pub row_size: usize,
    /// Header shared by both node kinds.
    pub common_node_header_size: usize,
    /// Full leaf header.
    pub leaf_node_header_size: usize,
    /// Width of one leaf cell.
    pub leaf_node_cell_size: usize,
    /// Bytes available for leaf cells.
    pub leaf_node_space_for_cells: usize,
    /// Maximum cells per leaf.
    pub leaf_node_max_cells: usize,
}

impl fmt::Display for LayoutConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROW_SIZE: {}", self.row_size)?;
        writeln!(f, "COMMON_NODE_HEADER_SIZE: {}", self.common_node_header_size)?;
        writeln!(f, "LEAF_NODE_HEADER_SIZE: {}", self.leaf_node_header_size)?;
        writeln!(f, "LEAF_NODE_CELL_SIZE: {}", self.leaf_node_cell_size)?;
        writeln!(f, "LEAF_NODE_SPACE_FOR_CELLS: {}", self.leaf_node_space_for_cells)?;
        writeln!(f, "LEAF_NODE_MAX_CELLS: {}", self.leaf_node_max_cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_file_format() {
        let layout = Layout::DEFAULT;
        assert_eq!(layout.page_size, 4096);
        assert_eq!(layout.row_size, 293);
        assert_eq!(layout.leaf_cell_size, 297);
        assert_eq!(layout.leaf_space_for_cells, 4082);
        assert_eq!(layout.leaf_max_cells, 13);
    }

    #[test]
    fn split_counts_give_left_the_ceiling() {
        let layout = Layout::DEFAULT;
        assert_eq!(layout.leaf_left_split_count, 7);
        assert_eq!(layout.leaf_right_split_count, 7);
        assert_eq!(
            layout.leaf_left_split_count + layout.leaf_right_split_count,
            layout.leaf_max_cells + 1
        );

        // 1024-byte pages hold 3 cells: 4 slots split 2/2.
        let small = Layout::for_page_size(1024).unwrap();
        assert_eq!(small.leaf_max_cells, 3);
        assert_eq!(small.leaf_left_split_count, 2);
        assert_eq!(small.leaf_right_split_count, 2);

        // 1400-byte pages hold 4 cells: 5 slots split 3/2.
        let odd = Layout::for_page_size(1400).unwrap();
        assert_eq!(odd.leaf_max_cells, 4);
        assert_eq!(odd.leaf_left_split_count, 3);
        assert_eq!(odd.leaf_right_split_count, 2);
    }

    #[test]
    fn tiny_pages_are_rejected() {
        let err = Layout::for_page_size(512).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn constants_render_one_per_line() {
        let text = Layout::DEFAULT.constants().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ROW_SIZE: 293",
                "COMMON_NODE_HEADER_SIZE: 6",
                "LEAF_NODE_HEADER_SIZE: 14",
                "LEAF_NODE_CELL_SIZE: 297",
                "LEAF_NODE_SPACE_FOR_CELLS: 4082",
                "LEAF_NODE_MAX_CELLS: 13",
            ]
        );
    }
}
