use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::types::{PageId, Result};

use super::page::{self, InternalNode, LeafNode, NodeKind};
use super::tree::BTree;

const MAX_FINDINGS: usize = 32;

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Suspicious but readable state.
    Warning,
    /// The tree violates an ordering or linkage rule.
    Error,
}

/// A single issue discovered during verification.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyFinding {
    /// The severity level of this finding.
    pub severity: VerifySeverity,
    /// Page the finding refers to.
    pub page: PageId,
    /// Human-readable description of the issue.
    pub message: String,
}

/// Counters gathered while walking the tree.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyCounts {
    /// Pages reached from the root.
    pub pages_visited: u32,
    /// Leaves reached from the root.
    pub leaves: u32,
    /// Internal nodes reached from the root.
    pub internal_nodes: u32,
    /// Rows stored across all leaves.
    pub rows: u64,
    /// Levels from the root down to the leaves.
    pub depth: u32,
}

/// Outcome of [`BTree::verify`].
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    /// Whether no error-level findings were recorded.
    pub success: bool,
    /// Structural counters.
    pub counts: VerifyCounts,
    /// Up to 32 findings, in discovery order.
    pub findings: Vec<VerifyFinding>,
}

struct Walk {
    counts: VerifyCounts,
    findings: Vec<VerifyFinding>,
    visited: HashSet<PageId>,
    leaves_in_order: Vec<PageId>,
}

impl Walk {
    fn record(&mut self, severity: VerifySeverity, page: PageId, message: impl Into<String>) {
        if self.findings.len() < MAX_FINDINGS {
            self.findings.push(VerifyFinding {
                severity,
                page,
                message: message.into(),
            });
        }
    }

    fn error(&mut self, page: PageId, message: impl Into<String>) {
        self.record(VerifySeverity::Error, page, message);
    }
}

impl BTree {
    /// Walks the tree from the root and checks key order, separator keys and
    /// the leaf chain. Structural problems become findings; only I/O and
    /// bounds failures are returned as errors.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        let mut walk = Walk {
            counts: VerifyCounts::default(),
            findings: Vec::new(),
            visited: HashSet::new(),
            leaves_in_order: Vec::new(),
        };
        let root = self.pager.get_page(PageId::ROOT)?;
        if !page::is_root(root) {
            walk.error(PageId::ROOT, "page 0 does not carry the root flag");
        }
        self.verify_node(PageId::ROOT, 1, (None, None), &mut walk)?;
        self.verify_leaf_chain(&mut walk)?;

        let num_pages = self.pager.num_pages();
        let unreachable = num_pages.saturating_sub(walk.counts.pages_visited);
        if unreachable > 0 {
            walk.record(
                VerifySeverity::Warning,
                PageId(num_pages.saturating_sub(1)),
                format!("{unreachable} of {num_pages} pages are not reachable from the root"),
            );
        }

        let success = walk
            .findings
            .iter()
            .all(|finding| finding.severity != VerifySeverity::Error);
        if !success {
            warn!(findings = walk.findings.len(), "btree.verify_failed");
        }
        Ok(VerifyReport {
            success,
            counts: walk.counts,
            findings: walk.findings,
        })
    }

    /// Checks the subtree at `page_id`, whose keys must lie in `(low, high]`.
    /// Returns the largest key found in the subtree.
    fn verify_node(
        &mut self,
        page_id: PageId,
        level: u32,
        bounds: (Option<u32>, Option<u32>),
        walk: &mut Walk,
    ) -> Result<Option<u32>> {
        if !walk.visited.insert(page_id) {
            walk.error(page_id, "page is referenced more than once");
            return Ok(None);
        }
        if page_id.0 >= self.pager.num_pages() {
            walk.error(page_id, "child pointer past the end of the file");
            return Ok(None);
        }
        walk.counts.pages_visited += 1;
        walk.counts.depth = walk.counts.depth.max(level);

        let buf = self.pager.get_page(page_id)?;
        if page_id != PageId::ROOT && page::is_root(buf) {
            walk.error(page_id, "non-root page carries the root flag");
        }
        let kind = match page::node_kind(buf) {
            Ok(kind) => kind,
            Err(_) => {
                walk.error(page_id, format!("unknown node type tag {}", buf[0]));
                return Ok(None);
            }
        };
        let (low, high) = bounds;
        match kind {
            NodeKind::Leaf => {
                let leaf = LeafNode::new(&*buf);
                let keys: Vec<u32> = (0..leaf.num_cells()).map(|cell| leaf.key(cell)).collect();
                walk.counts.leaves += 1;
                walk.counts.rows += keys.len() as u64;
                walk.leaves_in_order.push(page_id);
                check_keys(page_id, &keys, low, high, walk);
                Ok(keys.last().copied())
            }
            NodeKind::Internal => {
                let node = InternalNode::new(&*buf);
                let num_keys = node.num_keys();
                let keys: Vec<u32> = (0..num_keys).map(|idx| node.key(idx)).collect();
                let mut children = Vec::with_capacity(keys.len() + 1);
                for idx in 0..=num_keys {
                    children.push(node.child(idx)?);
                }
                walk.counts.internal_nodes += 1;
                if keys.is_empty() {
                    walk.error(page_id, "internal node without keys");
                }
                check_keys(page_id, &keys, low, high, walk);

                let mut subtree_max = None;
                let mut child_low = low;
                for (idx, child) in children.into_iter().enumerate() {
                    let separator = keys.get(idx).copied();
                    let child_high = separator.or(high);
                    let child_max =
                        self.verify_node(child, level + 1, (child_low, child_high), walk)?;
                    if let (Some(separator), Some(child_max)) = (separator, child_max) {
                        if separator != child_max {
                            walk.error(
                                page_id,
                                format!(
                                    "separator {separator} differs from max key {child_max} of child page {child}"
                                ),
                            );
                        }
                    }
                    subtree_max = child_max.or(subtree_max);
                    child_low = separator.or(child_low);
                }
                Ok(subtree_max)
            }
        }
    }

    fn verify_leaf_chain(&mut self, walk: &mut Walk) -> Result<()> {
        let expected = walk.leaves_in_order.clone();
        let Some(&first) = expected.first() else {
            return Ok(());
        };
        let mut current = Some(first);
        let mut position = 0usize;
        let limit = self.pager.max_pages() as usize;
        while let Some(page_id) = current {
            if position > limit {
                walk.error(page_id, "leaf chain does not terminate");
                return Ok(());
            }
            match expected.get(position) {
                Some(&want) if want == page_id => {}
                Some(&want) => {
                    walk.error(
                        page_id,
                        format!("leaf chain reaches page {page_id} where page {want} was expected"),
                    );
                    return Ok(());
                }
                None => {
                    walk.error(page_id, "leaf chain continues past the rightmost leaf");
                    return Ok(());
                }
            }
            if page_id.0 >= self.pager.num_pages() {
                return Ok(());
            }
            let buf = self.pager.get_page(page_id)?;
            current = LeafNode::new(&*buf).next_leaf();
            position += 1;
        }
        if position < expected.len() {
            walk.error(
                expected[position - 1],
                "leaf chain ends before the rightmost leaf",
            );
        }
        Ok(())
    }
}

fn check_keys(page: PageId, keys: &[u32], low: Option<u32>, high: Option<u32>, walk: &mut Walk) {
    for pair in keys.windows(2) {
        if pair[0] >= pair[1] {
            walk.error(
                page,
                format!("keys out of order: {} before {}", pair[0], pair[1]),
            );
        }
    }
    if let (Some(low), Some(&first)) = (low, keys.first()) {
        if first <= low {
            walk.error(page, format!("key {first} not above lower bound {low}"));
        }
    }
    if let (Some(high), Some(&last)) = (high, keys.last()) {
        if last > high {
            walk.error(page, format!("key {last} above upper bound {high}"));
        }
    }
}
