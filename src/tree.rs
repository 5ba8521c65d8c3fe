//! The semi-compressed net-tree.
//!
//! [`NetTree`] owns the node arena, the point set, the tree constants and
//! the attached point-location structure. Every structural change goes
//! through this module and is reported to the locator right after it is
//! applied.
//!
//! # Thread Safety
//!
//! `NetTree` is a single-writer structure: an insertion (including its
//! promotions and every locator hook) must finish before the next begins.
//! Use [`SyncNetTree`](crate::SyncNetTree) with the `sync` feature to share
//! one tree between threads.

use crate::config::{LocatorKind, NetParams, NetTreeConfig};
use crate::error::{NetTreeError, Result};
use crate::locate::{PointLocation, SinglePathLocator, TreeView};
use crate::node::{Level, Node, NodeArena, NodeId};
use crate::point::{PointId, PointSet};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Bit patterns of a point's coordinates, with `-0.0` folded into `0.0`.
type CoordKey = SmallVec<[u64; 4]>;

#[derive(Debug)]
pub struct NetTree {
    arena: NodeArena,
    points: PointSet,
    params: NetParams,
    root: Option<NodeId>,
    locator: Box<dyn PointLocation>,
    residents: FxHashMap<CoordKey, NodeId>,
}

impl NetTree {
    /// An empty tree over `points`. Call [`set_root`](Self::set_root) or
    /// [`construct`](Self::construct) next.
    ///
    /// Until `construct` installs another one, insertions are located by
    /// single-path descent.
    pub fn new(points: PointSet, params: NetParams) -> Self {
        Self {
            arena: NodeArena::new(),
            points,
            params,
            root: None,
            locator: Box::new(SinglePathLocator),
            residents: FxHashMap::default(),
        }
    }

    /// An empty tree with an empty point set, both taken from `config`.
    pub fn from_config(config: &NetTreeConfig) -> Result<Self> {
        let params = config.params()?;
        let points = PointSet::with_kind(config.metric).with_cache(config.cache_distances);
        Ok(Self::new(points, params))
    }

    /// Replace the point-location structure used by later insertions.
    pub fn set_locator(&mut self, locator: Box<dyn PointLocation>) {
        self.locator = locator;
    }

    pub fn locator(&self) -> &dyn PointLocation {
        self.locator.as_ref()
    }

    /// Add a point to the tree's point set without inserting it.
    pub fn add_point(&mut self, coords: impl IntoIterator<Item = f64>) -> Result<PointId> {
        self.points.push(coords)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn level(&self, id: NodeId) -> Option<Level> {
        self.node(id).map(Node::level)
    }

    pub fn point_of(&self, id: NodeId) -> Option<PointId> {
        self.node(id).map(Node::point)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.node(id).map(Node::children)
    }

    pub fn relatives(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.node(id).map(Node::relatives)
    }

    pub fn get_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.children().iter().next().copied())
    }

    /// Number of live nodes, sentinels included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Mutable access to the node links, for building or damaging trees in
    /// tests and tools. Nothing re-validates the result.
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn params(&self) -> &NetParams {
        &self.params
    }

    pub fn view(&self) -> TreeView<'_> {
        TreeView {
            arena: &self.arena,
            points: &self.points,
            params: self.params,
            root: self.root,
        }
    }

    /// Split the borrow of `self` into the locator and a view of everything
    /// else, so hooks can read the tree while updating themselves.
    fn locator_and_view(&mut self) -> (&mut dyn PointLocation, TreeView<'_>) {
        let view = TreeView {
            arena: &self.arena,
            points: &self.points,
            params: self.params,
            root: self.root,
        };
        (self.locator.as_mut(), view)
    }

    /// Nearest resident node for a pending point, per the attached locator.
    pub fn nn(&self, point: PointId) -> Option<NodeId> {
        self.locator.nn(&self.view(), point)
    }

    pub fn nn_dist(&self, point: PointId) -> Option<f64> {
        self.locator.nn_dist(&self.view(), point)
    }

    fn check_point(&self, point: PointId) -> Result<()> {
        if self.points.contains(point) {
            Ok(())
        } else {
            Err(NetTreeError::UnknownPoint(point))
        }
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.arena.contains(id) {
            Ok(())
        } else {
            Err(NetTreeError::UnknownNode(id))
        }
    }

    fn coord_key(&self, point: PointId) -> CoordKey {
        self.points[point]
            .coords()
            .iter()
            .map(|&c| (c + 0.0).to_bits())
            .collect()
    }

    /// A live node carrying the same coordinates as `point`, if any.
    fn resident(&self, point: PointId) -> Option<NodeId> {
        let id = *self.residents.get(&self.coord_key(point))?;
        if self.arena.contains(id) {
            return Some(id);
        }
        self.arena
            .iter()
            .filter(|(_, n)| self.points[n.point()] == self.points[point])
            .min_by_key(|(_, n)| n.level())
            .map(|(id, _)| id)
    }

    fn same_point_child(&self, id: NodeId) -> Option<NodeId> {
        let point = self.arena[id].point();
        self.arena[id]
            .children()
            .iter()
            .copied()
            .find(|&c| self.arena[c].point() == point)
    }

    /// Make `point` the root at level `+inf`, with a jump to the `-inf`
    /// sentinel below it.
    pub fn set_root(&mut self, point: PointId) -> Result<NodeId> {
        self.check_point(point)?;
        if self.root.is_some() {
            return Err(NetTreeError::InvalidInput("tree already has a root".into()));
        }
        let root = self.arena.alloc(point, Level::PosInf);
        self.root = Some(root);
        let key = self.coord_key(point);
        self.residents.insert(key, root);
        self.split(root, Level::NegInf);
        log::debug!("root set to point {}", point);
        Ok(root)
    }

    /// Build the tree from a point sequence: the first point becomes the
    /// root and the rest are inserted in order, located with `kind`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nettree::{LocatorKind, NetParams, NetTree, PointSet, MetricKind};
    ///
    /// let (points, ids) = PointSet::from_rows(MetricKind::Euclidean, [[2.0], [11.0], [28.0], [0.0]])?;
    /// let mut tree = NetTree::new(points, NetParams::new(2.0, 1.0, 1.0, Some(4.0))?);
    /// tree.construct(&ids, LocatorKind::Cells)?;
    /// assert_eq!(tree.point_of(tree.root().unwrap()), Some(ids[0]));
    /// # Ok::<(), nettree::NetTreeError>(())
    /// ```
    pub fn construct(&mut self, points: &[PointId], kind: LocatorKind) -> Result<NodeId> {
        let Some((&first, rest)) = points.split_first() else {
            return Err(NetTreeError::InsufficientArguments(
                "construct needs at least one point".into(),
            ));
        };
        for &point in points {
            self.check_point(point)?;
        }

        let root = self.set_root(first)?;
        self.locator = kind.build(&self.view(), rest)?;
        for &point in rest {
            self.insert(point, None)?;
        }

        log::debug!(
            "constructed tree over {} points with {:?} location: {} nodes, {} distance evaluations",
            points.len(),
            kind,
            self.arena.len(),
            self.points.counter()
        );
        Ok(root)
    }

    /// Insert `point`, starting from `closest` or from the locator's answer.
    /// Points the locator does not track fall back to single-path descent.
    ///
    /// Returns the node created for the point at its lowest materialised
    /// level. A point equal to a resident one is not inserted again; the
    /// resident node is returned instead.
    pub fn insert(&mut self, point: PointId, closest: Option<NodeId>) -> Result<NodeId> {
        self.check_point(point)?;
        let root = self.root.ok_or(NetTreeError::NoRoot)?;
        if let Some(id) = closest {
            self.check_node(id)?;
        }

        if let Some(resident) = self.resident(point) {
            self.locator.remove_point(point);
            log::warn!("point {} duplicates the point of node {}; skipped", point, resident);
            return Ok(resident);
        }

        // Points added after construction are not tracked by cell location.
        let mut closest = closest
            .or_else(|| self.nn(point))
            .or_else(|| SinglePathLocator.nn(&self.view(), point))
            .filter(|&id| self.arena.contains(id))
            .unwrap_or(root);
        self.locator.remove_point(point);

        let mut d = self.points.dist(self.arena[closest].point(), point);
        if d == 0.0 {
            log::warn!("point {} duplicates the point of node {}; skipped", point, closest);
            return Ok(closest);
        }
        let mut level = self.params.min_level(d);

        while level > self.arena[closest].level() {
            let Some(parent) = self.arena[closest].parent() else {
                break;
            };
            closest = parent;
            d = self.points.dist(self.arena[closest].point(), point);
            if d == 0.0 {
                log::warn!("point {} duplicates the point of node {}; skipped", point, closest);
                return Ok(closest);
            }
            level = self.params.min_level(d);
        }

        while level < self.arena[closest].level() {
            match self.same_point_child(closest) {
                Some(child) if self.arena[child].level() >= level => closest = child,
                _ => closest = self.split(closest, level),
            }
        }

        let node = self.arena.alloc(point, level);
        let key = self.coord_key(point);
        self.residents.insert(key, node);
        self.update(node, closest);
        self.nest(node);

        let mut top = node;
        while !self.view().is_covered(top) {
            top = self.promote_node(top);
        }
        Ok(node)
    }

    /// Give a fresh node its same-point child one level down.
    fn nest(&mut self, node: NodeId) {
        if self.arena[node].is_leaf() {
            self.split(node, Level::NegInf);
            return;
        }
        if self.same_point_child(node).is_some() {
            return;
        }

        let point = self.arena[node].point();
        let child = self.arena.alloc(point, self.arena[node].level().down());
        let siblings: Vec<NodeId> = self.arena[node].children().iter().copied().collect();
        for sibling in siblings {
            if self.view().is_rel(child, sibling) {
                self.arena.add_relative(child, sibling);
            }
        }
        self.arena.add_child(node, child);
        let (locator, view) = self.locator_and_view();
        locator.update_on_insertion(&view, child);
        self.split(child, Level::NegInf);
    }

    /// Create a copy of `node`'s point one level higher and link it in.
    pub fn promote(&mut self, node: NodeId) -> Result<NodeId> {
        self.check_node(node)?;
        if self.arena[node].parent().is_none() {
            return Err(NetTreeError::InvalidInput(format!(
                "node {} has no parent to promote under",
                node
            )));
        }
        Ok(self.promote_node(node))
    }

    fn promote_node(&mut self, node: NodeId) -> NodeId {
        let promoted = self
            .arena
            .alloc(self.arena[node].point(), self.arena[node].level().up());
        if let Some(parent) = self.arena[node].parent() {
            self.update(promoted, parent);
        }
        self.update_rel(node, node);
        log::debug!(
            "promoted point {} to level {}",
            self.arena[promoted].point(),
            self.arena[promoted].level()
        );
        promoted
    }

    /// Wire relatives, children and the parent of `node` using `closest`'s
    /// neighbourhood, then report the insertion to the locator.
    pub fn update(&mut self, node: NodeId, closest: NodeId) {
        let closest_level = self.arena[closest].level();
        if let Some(parent) = self.arena[closest].parent()
            && self.arena[parent].level() > closest_level.up()
        {
            self.split_above_node(closest, closest_level.up());
        }

        let anchor = self.arena[closest].parent();
        self.update_rel(node, closest);
        self.update_ch(node);
        let parent_ref = if self.arena.contains(closest) {
            self.arena[closest].parent()
        } else {
            anchor
        };
        self.update_par(node, parent_ref);

        let (locator, view) = self.locator_and_view();
        locator.update_on_insertion(&view, node);
    }

    /// Link `node` to every relative among the children of the relatives of
    /// `closest`'s parent, splitting lower candidates up to `node`'s level.
    pub fn update_rel(&mut self, node: NodeId, closest: NodeId) {
        let Some(parent) = self.arena[closest].parent() else {
            return;
        };
        let candidates = self.arena.children_of(self.arena.relatives_of([parent]));
        let level = self.arena[node].level();
        for candidate in candidates {
            if !self.arena.contains(candidate) || !self.view().is_rel(node, candidate) {
                continue;
            }
            let other = if self.arena[candidate].level() < level {
                self.split_above_node(candidate, level)
            } else {
                candidate
            };
            self.arena.add_relative(node, other);
        }
    }

    /// Adopt every child of `node`'s relatives that is strictly closer to
    /// `node` than to its current parent.
    pub fn update_ch(&mut self, node: NodeId) {
        let candidates = self.arena.children_of(self.arena.relatives_of([node]));
        for candidate in candidates {
            if !self.arena.contains(candidate) {
                continue;
            }
            let Some(old) = self.arena[candidate].parent() else {
                continue;
            };
            if old == node {
                continue;
            }
            if self.arena.dist(&self.points, node, candidate)
                < self.arena.dist(&self.points, candidate, old)
            {
                self.arena.add_child(node, candidate);
                self.compress(old);
            }
        }
    }

    /// Remove the node below `old` if it became a redundant link in a chain.
    fn compress(&mut self, old: NodeId) {
        if self.arena[old].children().len() != 1 {
            return;
        }
        let Some(mid) = self.arena.get_child(old) else {
            return;
        };
        let mid_node = &self.arena[mid];
        if mid_node.children().len() != 1 || mid_node.relatives().len() != 1 {
            return;
        }
        let Some(grandchild) = self.arena.get_child(mid) else {
            return;
        };

        let (locator, view) = self.locator_and_view();
        locator.update_on_removal(&view, mid);
        self.arena.add_child(old, grandchild);
        self.arena.remove(mid);
        log::debug!(
            "compressed node {} out of the chain below {} (level {})",
            mid,
            old,
            self.arena[old].level()
        );
    }

    /// Attach `node` under the nearest relative of `anchor`, preferring
    /// `anchor` itself on ties.
    pub fn update_par(&mut self, node: NodeId, anchor: Option<NodeId>) {
        let Some(anchor) = anchor else {
            return;
        };
        let mut best = anchor;
        let mut best_dist = self.arena.dist(&self.points, node, anchor);
        for &candidate in self.arena[anchor].relatives() {
            let d = self.arena.dist(&self.points, node, candidate);
            if d < best_dist {
                best = candidate;
                best_dist = d;
            }
        }

        let level = self.arena[node].level();
        if self.arena[best].children().len() == 1
            && let Some(child) = self.arena.get_child(best)
            && self.arena[child].level() < level
        {
            let split = self.split(best, level);
            if self.view().is_rel(node, split) {
                self.arena.add_relative(node, split);
            }
        }
        self.arena.add_child(best, node);
    }

    /// Materialise `node`'s point at `level` between `node` and its single
    /// child.
    pub fn split_below(&mut self, node: NodeId, level: Level) -> Result<NodeId> {
        self.check_node(node)?;
        let current = &self.arena[node];
        if current.children().len() > 1 {
            return Err(NetTreeError::InvalidInput(format!(
                "cannot split below node {} with {} children",
                node,
                current.children().len()
            )));
        }
        let below = self.get_child(node).map(|c| self.arena[c].level());
        if level >= current.level() || below.is_some_and(|floor| level <= floor) {
            return Err(NetTreeError::InvalidInput(format!(
                "split level {} is outside the jump below node {}",
                level, node
            )));
        }
        Ok(self.split(node, level))
    }

    /// [`split_below`](Self::split_below) applied to `node`'s parent.
    pub fn split_above(&mut self, node: NodeId, level: Level) -> Result<NodeId> {
        self.check_node(node)?;
        let parent = self.arena[node]
            .parent()
            .ok_or_else(|| NetTreeError::InvalidInput(format!("node {} has no parent", node)))?;
        self.split_below(parent, level)
    }

    fn split_above_node(&mut self, node: NodeId, level: Level) -> NodeId {
        match self.arena[node].parent() {
            Some(parent) => self.split(parent, level),
            None => node,
        }
    }

    fn split(&mut self, node: NodeId, level: Level) -> NodeId {
        let split = self.arena.alloc(self.arena[node].point(), level);
        if let Some(child) = self.arena.get_child(node) {
            debug_assert_eq!(self.arena[node].children().len(), 1);
            self.arena.add_child(split, child);
        }
        self.arena.add_child(node, split);

        let (locator, view) = self.locator_and_view();
        locator.update_on_split(&view, split);
        log::debug!("split node {} at level {} below {}", split, level, node);
        split
    }
}
