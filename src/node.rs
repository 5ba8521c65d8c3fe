//! Tree vertices and the arena that owns them.
//!
//! Parent, child and relative links are [`NodeId`] handles into a
//! [`NodeArena`], so the cyclic parent/child/relative graph never needs
//! shared ownership. Children and relatives are kept in ordered sets and
//! iterate in handle order.

use crate::point::{PointId, PointSet};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

/// Scale index of a node. `NegInf < Finite(_) < PosInf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    NegInf,
    Finite(i32),
    PosInf,
}

impl Level {
    /// One level up. Infinite levels are unchanged.
    pub fn up(self) -> Self {
        match self {
            Level::Finite(l) => Level::Finite(l + 1),
            other => other,
        }
    }

    /// One level down. Infinite levels are unchanged.
    pub fn down(self) -> Self {
        match self {
            Level::Finite(l) => Level::Finite(l - 1),
            other => other,
        }
    }
}

impl From<i32> for Level {
    fn from(level: i32) -> Self {
        Level::Finite(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::NegInf => write!(f, "-inf"),
            Level::Finite(l) => write!(f, "{}", l),
            Level::PosInf => write!(f, "inf"),
        }
    }
}

/// Stable handle of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A `(point, level)` pair with its links.
#[derive(Debug, Clone)]
pub struct Node {
    point: PointId,
    level: Level,
    parent: Option<NodeId>,
    children: BTreeSet<NodeId>,
    relatives: BTreeSet<NodeId>,
}

impl Node {
    pub fn point(&self) -> PointId {
        self.point
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &BTreeSet<NodeId> {
        &self.children
    }

    /// Relatives, always including the node itself.
    pub fn relatives(&self) -> &BTreeSet<NodeId> {
        &self.relatives
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Owner of every node of one tree.
///
/// Removed nodes leave a tombstone so handles are never reused.
#[derive(Debug, Default, Clone)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node that is its own only relative.
    pub fn alloc(&mut self, point: PointId, level: Level) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        let mut relatives = BTreeSet::new();
        relatives.insert(id);
        self.slots.push(Some(Node {
            point,
            level,
            parent: None,
            children: BTreeSet::new(),
            relatives,
        }));
        self.live += 1;
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("node {} was removed", id))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    /// Record `a` and `b` as mutual relatives.
    pub fn add_relative(&mut self, a: NodeId, b: NodeId) {
        self.slot_mut(a).relatives.insert(b);
        self.slot_mut(b).relatives.insert(a);
    }

    /// Drop the mutual relative link between `a` and `b`.
    pub fn remove_relative(&mut self, a: NodeId, b: NodeId) {
        self.slot_mut(a).relatives.remove(&b);
        self.slot_mut(b).relatives.remove(&a);
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.slot_mut(child).parent.replace(parent) {
            self.slot_mut(old).children.remove(&child);
        }
        self.slot_mut(parent).children.insert(child);
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.add_child(parent, child);
    }

    /// Drop a slot without unlinking it, leaving dangling handles behind.
    #[cfg(test)]
    pub(crate) fn forget(&mut self, id: NodeId) {
        if self.slots[id.index()].take().is_some() {
            self.live -= 1;
        }
    }

    /// An arbitrary child (the lowest handle).
    pub fn get_child(&self, id: NodeId) -> Option<NodeId> {
        self[id].children.iter().next().copied()
    }

    /// Unlink a node from its parent and relatives and tombstone it.
    ///
    /// Children must have been moved elsewhere first.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.index())?.take()?;
        self.live -= 1;
        debug_assert!(node.children.is_empty(), "removed node {} had children", id);
        if let Some(parent) = node.parent {
            if let Some(Some(p)) = self.slots.get_mut(parent.index()) {
                p.children.remove(&id);
            }
        }
        for &other in node.relatives.iter().filter(|&&r| r != id) {
            if let Some(Some(r)) = self.slots.get_mut(other.index()) {
                r.relatives.remove(&id);
            }
        }
        Some(node)
    }

    /// Union of the children of every given node.
    pub fn children_of(&self, ids: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        ids.into_iter()
            .flat_map(|id| self[id].children.iter().copied())
            .collect()
    }

    /// Union of the relatives of every given node.
    pub fn relatives_of(&self, ids: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        ids.into_iter()
            .flat_map(|id| self[id].relatives.iter().copied())
            .collect()
    }

    /// Parents of the given nodes, skipping nodes without one.
    pub fn parents_of(&self, ids: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        ids.into_iter().filter_map(|id| self[id].parent).collect()
    }

    /// Distance between the points of two nodes.
    pub fn dist(&self, points: &PointSet, a: NodeId, b: NodeId) -> f64 {
        points.dist(self[a].point, self[b].point)
    }

    /// The candidate nearest to `target`; the first one wins ties.
    pub fn nearest(
        &self,
        points: &PointSet,
        target: PointId,
        candidates: impl IntoIterator<Item = NodeId>,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for id in candidates {
            let d = points.dist(target, self[id].point);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id)
            .unwrap_or_else(|| panic!("node {} is not in the arena", id))
    }
}
