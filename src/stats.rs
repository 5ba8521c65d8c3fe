use crate::node::{Level, NodeId};
use crate::tree::NetTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shape statistics of a net-tree
///
/// Counted over every finite-level node below the root. The topmost such
/// node is not counted in `node_count` and its level is not counted in
/// `level_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeStats {
    /// Finite-level nodes, excluding the top one
    pub node_count: usize,
    /// Children of nodes that do not end in a jump to the `-inf` sentinel
    pub child_count: usize,
    /// Sum of relative-set sizes, minus one
    pub relative_count: usize,
    /// Distinct finite levels, minus one
    pub level_count: usize,
    /// Single-child edges that skip at least one level, excluding edges into
    /// the sentinel
    pub jump_count: usize,
}

impl TreeStats {
    pub fn of(tree: &NetTree) -> Self {
        let mut stats = Self::default();
        let mut nodes = 0usize;
        let mut relatives = 0usize;
        let mut levels: BTreeSet<i32> = BTreeSet::new();

        let top = tree.root().and_then(|root| tree.get_child(root));
        let mut stack: Vec<NodeId> = top.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = tree.node(id) else { continue };
            let Level::Finite(level) = node.level() else {
                continue;
            };

            nodes += 1;
            relatives += node.relatives().len();
            levels.insert(level);

            let child_level = tree.get_child(id).and_then(|c| tree.level(c));
            if child_level != Some(Level::NegInf) {
                stats.child_count += node.children().len();
            }
            if node.children().len() == 1
                && let Some(Level::Finite(below)) = child_level
                && level > below + 1
            {
                stats.jump_count += 1;
            }

            stack.extend(node.children().iter().copied());
        }

        stats.node_count = nodes.saturating_sub(1);
        stats.relative_count = relatives.saturating_sub(1);
        stats.level_count = levels.len().saturating_sub(1);
        stats
    }
}
