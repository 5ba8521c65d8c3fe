use super::{PointLocation, TreeView};
use crate::config::LocatorKind;
use crate::error::{NetTreeError, Result};
use crate::node::{Level, NodeId};
use crate::point::PointId;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

static EMPTY: BTreeSet<PointId> = BTreeSet::new();

/// Cell-based point location.
///
/// Every pending point has a center node and sits in either the inner or the
/// outer cell of that center. A point is in the inner cell when it lies
/// within `cp·tau^(level−1)/2` of the center; only outer-cell points are
/// reconsidered when nodes appear nearby. Center distances never increase.
#[derive(Debug, Default)]
pub struct CellLocator {
    inner: FxHashMap<NodeId, BTreeSet<PointId>>,
    outer: FxHashMap<NodeId, BTreeSet<PointId>>,
    center: FxHashMap<PointId, NodeId>,
    center_dist: FxHashMap<PointId, f64>,
}

impl CellLocator {
    /// Track `points`, all initially centered on the root's inner cell.
    pub fn new(tree: &TreeView<'_>, points: impl IntoIterator<Item = PointId>) -> Result<Self> {
        let root = tree.root.ok_or(NetTreeError::NoRoot)?;
        let mut locator = Self::default();
        locator.add_node(root);
        for point in points {
            locator.center.insert(point, root);
            locator.inner.entry(root).or_default().insert(point);
        }
        Ok(locator)
    }

    pub fn inner_cell(&self, node: NodeId) -> &BTreeSet<PointId> {
        self.inner.get(&node).unwrap_or(&EMPTY)
    }

    pub fn outer_cell(&self, node: NodeId) -> &BTreeSet<PointId> {
        self.outer.get(&node).unwrap_or(&EMPTY)
    }

    /// Union of the inner and outer cells of every given node.
    pub fn cell(&self, nodes: impl IntoIterator<Item = NodeId>) -> BTreeSet<PointId> {
        nodes
            .into_iter()
            .flat_map(|n| self.inner_cell(n).iter().chain(self.outer_cell(n)))
            .copied()
            .collect()
    }

    pub fn tracked_points(&self) -> impl Iterator<Item = PointId> + '_ {
        self.center.keys().copied()
    }

    fn center_dist(&self, tree: &TreeView<'_>, point: PointId, center: NodeId) -> f64 {
        match self.center_dist.get(&point) {
            Some(&d) => d,
            None => tree.dist_to(point, center),
        }
    }

    fn change(&mut self, tree: &TreeView<'_>, point: PointId, from: NodeId, to: NodeId, d: f64) {
        if let Some(cell) = self.inner.get_mut(&from) {
            cell.remove(&point);
        }
        if let Some(cell) = self.outer.get_mut(&from) {
            cell.remove(&point);
        }

        self.center.insert(point, to);
        self.center_dist.insert(point, d);
        self.add_node(to);
        if d <= tree.params.inner_radius(tree.level(to)) {
            self.inner.entry(to).or_default().insert(point);
        } else {
            self.outer.entry(to).or_default().insert(point);
        }
        log::trace!("point {} moved from {} to {} at distance {}", point, from, to, d);
    }

    fn try_change(&mut self, tree: &TreeView<'_>, point: PointId, to: NodeId) {
        let Some(&from) = self.center.get(&point) else {
            return;
        };
        let current = self.center_dist(tree, point, from);
        let same = tree.points.same(tree.point_of(from), tree.point_of(to));
        let d = if same {
            current
        } else {
            tree.dist_to(point, to)
        };

        if !tree.is_rel_at(to, point, d) {
            return;
        }
        let refines = same && tree.level(from) > tree.level(to);
        let closer = !same && d < current;
        if refines || closer {
            self.change(tree, point, from, to, d);
        }
    }
}

impl PointLocation for CellLocator {
    fn kind(&self) -> LocatorKind {
        LocatorKind::Cells
    }

    fn nn(&self, _tree: &TreeView<'_>, point: PointId) -> Option<NodeId> {
        self.center.get(&point).copied()
    }

    fn nn_dist(&self, tree: &TreeView<'_>, point: PointId) -> Option<f64> {
        let center = *self.center.get(&point)?;
        Some(self.center_dist(tree, point, center))
    }

    fn remove_point(&mut self, point: PointId) {
        if let Some(center) = self.center.remove(&point) {
            if let Some(cell) = self.inner.get_mut(&center) {
                cell.remove(&point);
            }
            if let Some(cell) = self.outer.get_mut(&center) {
                cell.remove(&point);
            }
        }
        self.center_dist.remove(&point);
    }

    fn add_node(&mut self, node: NodeId) {
        self.inner.entry(node).or_default();
        self.outer.entry(node).or_default();
    }

    fn update_on_split(&mut self, tree: &TreeView<'_>, node: NodeId) {
        self.add_node(node);
        if tree.level(node) == Level::NegInf {
            return;
        }
        let Some(parent) = tree.parent(node) else {
            return;
        };
        for point in self.cell([parent]) {
            self.try_change(tree, point, node);
        }
    }

    fn update_on_removal(&mut self, tree: &TreeView<'_>, node: NodeId) {
        let Some(parent) = tree.parent(node) else {
            return;
        };
        self.add_node(parent);

        let outer = self.outer.remove(&node).unwrap_or_default();
        for point in outer {
            let d = self.center_dist(tree, point, node);
            self.change(tree, point, node, parent, d);
        }

        let inner = self.inner.remove(&node).unwrap_or_default();
        for &point in &inner {
            self.center.insert(point, parent);
        }
        self.inner.entry(parent).or_default().extend(inner);
    }

    fn update_on_insertion(&mut self, tree: &TreeView<'_>, node: NodeId) {
        self.add_node(node);

        let arena = tree.arena;
        let near_parent = arena.relatives_of(tree.parent(node));
        let mut neighbourhood = arena.children_of(near_parent.iter().copied());
        neighbourhood.extend(near_parent);
        neighbourhood.extend(arena.children_of(arena.relatives_of([node])));

        let candidates: BTreeSet<PointId> = neighbourhood
            .into_iter()
            .flat_map(|n| self.outer_cell(n).iter().copied())
            .collect();
        for point in candidates {
            self.try_change(tree, point, node);
        }
    }
}
