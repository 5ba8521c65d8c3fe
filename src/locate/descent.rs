//! Point location by walking down from the root on every query.
//!
//! These keep no state and ignore every update hook.

use super::{PointLocation, TreeView};
use crate::config::LocatorKind;
use crate::node::{Level, NodeId};
use crate::point::PointId;
use std::collections::BTreeSet;

/// Greedy descent along a single path.
///
/// From the current node, step to the nearest child of its relatives that
/// is still within relative radius; stop when none is.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinglePathLocator;

impl PointLocation for SinglePathLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::SinglePath
    }

    fn nn(&self, tree: &TreeView<'_>, point: PointId) -> Option<NodeId> {
        let root = tree.root?;
        let arena = tree.arena;
        let mut current = root;
        let mut next = arena.get_child(root)?;

        while tree.dist_to(point, next) <= tree.params.rel_radius(tree.level(next)) {
            current = next;
            let candidates = arena.children_of(arena.relatives_of([current]));
            let Some(top) = candidates.iter().map(|&n| tree.level(n)).max() else {
                break;
            };
            let bound = tree.params.rel_radius(top);

            let mut best: Option<(NodeId, f64)> = None;
            for &n in &candidates {
                let d = tree.dist_to(point, n);
                let key = if d <= bound { d } else { f64::INFINITY };
                if best.is_none_or(|(_, bk)| key < bk) {
                    best = Some((n, key));
                }
            }
            match best {
                Some((n, _)) => next = n,
                None => break,
            }
        }
        Some(current)
    }
}

/// Level-by-level descent keeping every node within relative radius.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontierLocator;

impl PointLocation for FrontierLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Frontier
    }

    fn nn(&self, tree: &TreeView<'_>, point: PointId) -> Option<NodeId> {
        let root = tree.root?;
        let arena = tree.arena;
        let top = arena.get_child(root)?;
        let Level::Finite(mut level) = tree.level(top) else {
            return Some(root);
        };

        let mut frontier: BTreeSet<NodeId> = BTreeSet::from([top]);
        let mut last: Option<BTreeSet<NodeId>> = None;
        loop {
            let mut closest = f64::INFINITY;
            for &n in &frontier {
                let d = tree.dist_to(point, n);
                if d == 0.0 {
                    return Some(n);
                }
                closest = closest.min(d);
            }

            let radius = tree.params.rel_radius(Level::Finite(level));
            if closest > radius {
                break;
            }

            let below = Level::Finite(level - 1);
            let next: BTreeSet<NodeId> = arena
                .children_of(frontier.iter().copied())
                .into_iter()
                .filter(|&n| tree.dist_to(point, n) <= radius)
                .filter_map(|n| {
                    if tree.level(n) == below {
                        Some(n)
                    } else {
                        tree.parent(n)
                    }
                })
                .collect();

            last = Some(frontier);
            if next.is_empty() {
                break;
            }
            frontier = next;
            level -= 1;
        }

        match last {
            Some(front) => arena.nearest(tree.points, point, front),
            None => Some(root),
        }
    }
}

/// Keeps no state and never answers.
///
/// Insertions without an explicit `closest` fall back to single-path
/// descent from the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocator;

impl PointLocation for NoLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::None
    }

    fn nn(&self, _tree: &TreeView<'_>, _point: PointId) -> Option<NodeId> {
        None
    }
}
