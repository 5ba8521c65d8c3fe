//! Point location during construction.
//!
//! A [`PointLocation`] answers "which resident node is nearest to this
//! not-yet-inserted point" and is told about every structural change the
//! tree makes. Hooks receive a read-only [`TreeView`] of the tree they are
//! attached to.

mod cells;
mod descent;

pub use cells::CellLocator;
pub use descent::{FrontierLocator, NoLocator, SinglePathLocator};

use crate::config::{LocatorKind, NetParams};
use crate::error::Result;
use crate::node::{Level, Node, NodeArena, NodeId};
use crate::point::{PointId, PointSet};
use std::fmt;

/// Read-only access to a tree's nodes, points and constants.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a> {
    pub arena: &'a NodeArena,
    pub points: &'a PointSet,
    pub params: NetParams,
    pub root: Option<NodeId>,
}

impl<'a> TreeView<'a> {
    pub fn node(&self, id: NodeId) -> &'a Node {
        &self.arena[id]
    }

    pub fn level(&self, id: NodeId) -> Level {
        self.arena[id].level()
    }

    pub fn point_of(&self, id: NodeId) -> PointId {
        self.arena[id].point()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Distance from a point to the point of a node.
    pub fn dist_to(&self, point: PointId, node: NodeId) -> f64 {
        self.points.dist(point, self.point_of(node))
    }

    pub fn node_dist(&self, a: NodeId, b: NodeId) -> f64 {
        self.arena.dist(self.points, a, b)
    }

    /// Whether `point`, at distance `d` from `node`, is a relative of `node`
    /// at `node`'s level. Equal points always are.
    pub fn is_rel_at(&self, node: NodeId, point: PointId, d: f64) -> bool {
        self.points.same(self.point_of(node), point)
            || d <= self.params.rel_radius(self.level(node))
    }

    pub fn is_rel(&self, a: NodeId, b: NodeId) -> bool {
        self.is_rel_at(a, self.point_of(b), self.node_dist(a, b))
    }

    /// Whether a node is within covering distance of its parent. Nodes
    /// without a parent, and nodes sharing their parent's point, are.
    pub fn is_covered(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return true;
        };
        if self.point_of(parent) == self.point_of(id) {
            return true;
        }
        self.node_dist(id, parent) <= self.params.cover_radius(self.level(id))
    }
}

/// Nearest-node lookup for points waiting to be inserted.
///
/// Hooks are called by the tree after it has already applied the change
/// they describe, except [`update_on_removal`](Self::update_on_removal),
/// which runs while the removed node is still linked.
pub trait PointLocation: fmt::Debug + Send {
    fn kind(&self) -> LocatorKind;

    /// Believed-nearest resident node for `point`, if it is tracked.
    fn nn(&self, tree: &TreeView<'_>, point: PointId) -> Option<NodeId>;

    fn nn_dist(&self, tree: &TreeView<'_>, point: PointId) -> Option<f64> {
        self.nn(tree, point).map(|node| tree.dist_to(point, node))
    }

    /// Stop tracking a point once it has been inserted.
    fn remove_point(&mut self, _point: PointId) {}

    fn add_node(&mut self, _node: NodeId) {}

    /// `node` was just materialised inside a jump below its parent.
    fn update_on_split(&mut self, _tree: &TreeView<'_>, _node: NodeId) {}

    /// `node` is about to be compressed away into its parent.
    fn update_on_removal(&mut self, _tree: &TreeView<'_>, _node: NodeId) {}

    /// `node` was just created and linked.
    fn update_on_insertion(&mut self, _tree: &TreeView<'_>, _node: NodeId) {}
}

impl LocatorKind {
    /// Build the locator this kind names for a tree whose root is set and
    /// whose remaining points are `pending`.
    pub fn build(
        self,
        tree: &TreeView<'_>,
        pending: &[PointId],
    ) -> Result<Box<dyn PointLocation>> {
        Ok(match self {
            LocatorKind::Cells => Box::new(CellLocator::new(tree, pending.iter().copied())?),
            LocatorKind::SinglePath => Box::new(SinglePathLocator),
            LocatorKind::Frontier => Box::new(FrontierLocator),
            LocatorKind::None => Box::new(NoLocator),
        })
    }
}
