use std::fmt;

use serde::Serialize;

use crate::types::{PageId, Result, StoreError};

use super::page::{self, InternalNode, LeafNode, NodeKind};
use super::tree::BTree;

/// Structure of the tree below some page, as printed by `.btree`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeShape {
    /// A leaf and the keys of its cells.
    Leaf {
        /// Page holding the leaf.
        page: PageId,
        /// Cell keys in stored order.
        keys: Vec<u32>,
    },
    /// An internal node; `children` has one more entry than `keys`.
    Internal {
        /// Page holding the node.
        page: PageId,
        /// Separator keys.
        keys: Vec<u32>,
        /// Child subtrees, the rightmost child last.
        children: Vec<TreeShape>,
    },
}

impl TreeShape {
    /// Page at the top of this subtree.
    pub fn page(&self) -> PageId {
        match self {
            TreeShape::Leaf { page, .. } | TreeShape::Internal { page, .. } => *page,
        }
    }

    /// Keys stored directly in this node.
    pub fn keys(&self) -> &[u32] {
        match self {
            TreeShape::Leaf { keys, .. } | TreeShape::Internal { keys, .. } => keys,
        }
    }

    /// Child subtrees; empty for a leaf.
    pub fn children(&self) -> &[TreeShape] {
        match self {
            TreeShape::Leaf { .. } => &[],
            TreeShape::Internal { children, .. } => children,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        match self {
            TreeShape::Leaf { keys, .. } => {
                indent(f, level)?;
                writeln!(f, "- leaf (size {})", keys.len())?;
                for key in keys {
                    indent(f, level + 1)?;
                    writeln!(f, "- {key}")?;
                }
            }
            TreeShape::Internal { keys, children, .. } => {
                indent(f, level)?;
                writeln!(f, "- internal (size {})", keys.len())?;
                for (child, key) in children.iter().zip(keys) {
                    child.render(f, level + 1)?;
                    indent(f, level + 1)?;
                    writeln!(f, "- key {key}")?;
                }
                if let Some(rightmost) = children.get(keys.len()) {
                    rightmost.render(f, level + 1)?;
                }
            }
        }
        Ok(())
    }
}

fn indent(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    for _ in 0..level {
        f.write_str("  ")?;
    }
    Ok(())
}

impl fmt::Display for TreeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl BTree {
    /// Captures the shape of the whole tree.
    pub fn shape(&mut self) -> Result<TreeShape> {
        self.shape_of(PageId::ROOT, 0)
    }

    fn shape_of(&mut self, page_id: PageId, depth: u32) -> Result<TreeShape> {
        if depth > self.pager.max_pages() {
            return Err(StoreError::Corruption("tree deeper than page capacity"));
        }
        let buf = self.pager.get_page(page_id)?;
        match page::node_kind(buf)? {
            NodeKind::Leaf => {
                let leaf = LeafNode::new(&*buf);
                let keys = (0..leaf.num_cells()).map(|cell| leaf.key(cell)).collect();
                Ok(TreeShape::Leaf { page: page_id, keys })
            }
            NodeKind::Internal => {
                let node = InternalNode::new(&*buf);
                let num_keys = node.num_keys();
                let keys: Vec<u32> = (0..num_keys).map(|idx| node.key(idx)).collect();
                let child_ids = (0..=num_keys)
                    .map(|idx| node.child(idx))
                    .collect::<Result<Vec<_>>>()?;
                let children = child_ids
                    .into_iter()
                    .map(|child| self.shape_of(child, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TreeShape::Internal {
                    page: page_id,
                    keys,
                    children,
                })
            }
        }
    }
}
