//! Invariant checks over a built tree.
//!
//! [`Verifier`] is a read-only pass: it tabulates which nodes are live at
//! each level and the minimum level at which every pair of points becomes
//! relatives, then checks nesting, covering and packing (locally along
//! parent/child edges and globally against leaf descendants), relative
//! completeness and semi-compression. Every traversal uses an explicit
//! stack.

use crate::node::{Level, Node, NodeId};
use crate::point::PointId;
use crate::tree::NetTree;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// The first invariant violation a check found.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("tree has no root")]
    NoRoot,

    #[error("node {node} has children but none carries its point")]
    Nesting { node: NodeId },

    #[error("node {node} is closer to {relative} than to its parent")]
    Parent { node: NodeId, relative: NodeId },

    #[error("node {node} does not cover {descendant}: {distance} > {radius}")]
    Covering {
        node: NodeId,
        descendant: NodeId,
        distance: f64,
        radius: f64,
    },

    #[error("nodes {a} and {b} are packed too closely: {distance} <= {radius}")]
    Packing {
        a: NodeId,
        b: NodeId,
        distance: f64,
        radius: f64,
    },

    #[error("node {node} breaks semi-compression at level {level} ({relatives} relatives in range)")]
    SemiCompression {
        level: i32,
        node: NodeId,
        relatives: usize,
    },

    #[error("nodes {a} and {b} at level {level} should be relatives")]
    MissingRelative { level: i32, a: NodeId, b: NodeId },

    #[error("node {node} is linked from the tree but no longer exists")]
    UnknownNode { node: NodeId },
}

#[derive(Debug)]
pub struct Verifier<'a> {
    tree: &'a NetTree,
    points: Vec<PointId>,
    cp: f64,
    cc: f64,
    uncomp_levels: BTreeMap<i32, BTreeSet<NodeId>>,
    min_levels: FxHashMap<(PointId, PointId), Level>,
}

impl<'a> Verifier<'a> {
    /// Verify `tree` over the given points, with the tree's own packing and
    /// covering constants. Level tables are built immediately.
    pub fn new(tree: &'a NetTree, points: &[PointId]) -> Self {
        let params = tree.params();
        let mut verifier = Self {
            tree,
            points: points.to_vec(),
            cp: params.cp,
            cc: params.cc,
            uncomp_levels: BTreeMap::new(),
            min_levels: FxHashMap::default(),
        };
        verifier.populate();
        verifier
    }

    /// Check against another packing constant.
    pub fn with_packing(mut self, cp: f64) -> Self {
        self.cp = cp;
        self
    }

    /// Check against another covering constant.
    pub fn with_covering(mut self, cc: f64) -> Self {
        self.cc = cc;
        self
    }

    /// Rebuild both level tables.
    pub fn populate(&mut self) {
        self.find_uncomp_levels();
        self.find_min_level_rels();
    }

    pub fn uncomp_levels(&self) -> &BTreeMap<i32, BTreeSet<NodeId>> {
        &self.uncomp_levels
    }

    /// For every level spanned by a finite node, the nodes live there.
    ///
    /// A node is live from just above its highest child's level up to its
    /// own level. The lowest node of each point additionally stays live
    /// down to the lowest level of the tree.
    pub fn find_uncomp_levels(&mut self) -> &BTreeMap<i32, BTreeSet<NodeId>> {
        let tree = self.tree;
        let mut levels: BTreeMap<i32, BTreeSet<NodeId>> = BTreeMap::new();
        let mut lowest: FxHashMap<PointId, (NodeId, i32)> = FxHashMap::default();

        let top = tree.root().and_then(|root| tree.get_child(root));
        let mut stack: Vec<NodeId> = top.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = tree.node(id) else { continue };
            let Level::Finite(level) = node.level() else {
                continue;
            };

            let entry = lowest.entry(node.point()).or_insert((id, level));
            if entry.1 > level {
                *entry = (id, level);
            }

            let bottom = match tree.get_child(id).and_then(|c| tree.level(c)) {
                Some(Level::Finite(below)) => below,
                _ => level - 1,
            };
            for l in bottom + 1..=level {
                levels.entry(l).or_default().insert(id);
            }

            stack.extend(
                node.children()
                    .iter()
                    .copied()
                    .filter(|&c| tree.level(c) != Some(Level::NegInf)),
            );
        }

        if let Some(&floor) = levels.keys().next() {
            for &(id, level) in lowest.values() {
                for l in floor..level {
                    levels.entry(l).or_default().insert(id);
                }
            }
        }

        self.uncomp_levels = levels;
        &self.uncomp_levels
    }

    /// Minimum relative level of every ordered pair of points.
    pub fn find_min_level_rels(&mut self) -> &FxHashMap<(PointId, PointId), Level> {
        let points = self.tree.points();
        let params = self.tree.params();
        let mut table = FxHashMap::default();
        for &a in &self.points {
            for &b in &self.points {
                let level = if points.same(a, b) {
                    Level::NegInf
                } else {
                    params.min_level(points.dist(a, b))
                };
                table.insert((a, b), level);
            }
        }
        self.min_levels = table;
        &self.min_levels
    }

    /// Minimum level at which `a` and `b` are relatives.
    pub fn min_level(&self, a: PointId, b: PointId) -> Level {
        match self.min_levels.get(&(a, b)) {
            Some(&level) => level,
            None if self.tree.points().same(a, b) => Level::NegInf,
            None => self.tree.params().min_level(self.tree.points().dist(a, b)),
        }
    }

    /// Leaf descendants of every node reachable from the root.
    pub fn find_leaves(&self) -> FxHashMap<NodeId, BTreeSet<NodeId>> {
        let tree = self.tree;
        let mut leaves: FxHashMap<NodeId, BTreeSet<NodeId>> = FxHashMap::default();
        let mut stack: Vec<(NodeId, bool)> = tree.root().map(|r| (r, false)).into_iter().collect();

        while let Some((id, expanded)) = stack.pop() {
            let Some(node) = tree.node(id) else { continue };
            if node.is_leaf() {
                leaves.insert(id, BTreeSet::from([id]));
            } else if expanded {
                let mut below = BTreeSet::new();
                for c in node.children() {
                    if let Some(set) = leaves.get(c) {
                        below.extend(set.iter().copied());
                    }
                }
                leaves.insert(id, below);
            } else {
                stack.push((id, true));
                stack.extend(node.children().iter().map(|&c| (c, false)));
            }
        }
        leaves
    }

    fn dist(&self, a: NodeId, b: NodeId) -> f64 {
        self.tree.arena().dist(self.tree.points(), a, b)
    }

    fn scale(&self, level: Level) -> f64 {
        self.tree.params().scale(level)
    }

    fn node(&self, id: NodeId) -> Result<&'a Node, Violation> {
        self.tree.node(id).ok_or(Violation::UnknownNode { node: id })
    }

    /// Every handle `node` links to must still be live.
    fn check_links(&self, node: &Node) -> Result<(), Violation> {
        let linked = node
            .parent()
            .into_iter()
            .chain(node.children().iter().copied())
            .chain(node.relatives().iter().copied());
        for id in linked {
            self.node(id)?;
        }
        Ok(())
    }

    fn check_nesting(&self, id: NodeId, node: &Node) -> Result<(), Violation> {
        let nested = node.is_leaf()
            || node
                .children()
                .iter()
                .any(|&c| self.tree.point_of(c) == Some(node.point()));
        if nested {
            Ok(())
        } else {
            Err(Violation::Nesting { node: id })
        }
    }

    fn top(&self) -> Result<NodeId, Violation> {
        self.tree
            .root()
            .and_then(|root| self.tree.get_child(root))
            .ok_or(Violation::NoRoot)
    }

    pub fn is_local_net_tree(&self) -> bool {
        self.local_net_tree_violation().is_none()
    }

    /// Nesting, nearest parent, covering along every parent/child edge and
    /// packing between siblings.
    pub fn local_net_tree_violation(&self) -> Option<Violation> {
        report(self.check_local())
    }

    fn check_local(&self) -> Result<(), Violation> {
        let mut stack = vec![self.top()?];

        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            self.check_links(node)?;
            self.check_nesting(id, node)?;

            if let Some(parent) = node.parent() {
                let to_parent = self.dist(id, parent);
                for &relative in self.node(parent)?.relatives() {
                    if to_parent > self.dist(id, relative) {
                        return Err(Violation::Parent { node: id, relative });
                    }
                }
            }

            let radius = self.cc * self.scale(node.level());
            for &child in node.children() {
                stack.push(child);
                let distance = self.dist(id, child);
                if distance > radius {
                    return Err(Violation::Covering {
                        node: id,
                        descendant: child,
                        distance,
                        radius,
                    });
                }
                for &sibling in node.children() {
                    if sibling == child {
                        continue;
                    }
                    let level = self.node(child)?.level().max(self.node(sibling)?.level());
                    let radius = self.cp * self.scale(level);
                    let distance = self.dist(child, sibling);
                    if distance <= radius {
                        return Err(Violation::Packing {
                            a: child,
                            b: sibling,
                            distance,
                            radius,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn is_global_net_tree(&self) -> bool {
        self.global_net_tree_violation().is_none()
    }

    /// Nesting, covering of every leaf descendant and packing against every
    /// leaf outside the subtree.
    pub fn global_net_tree_violation(&self) -> Option<Violation> {
        report(self.check_global())
    }

    fn check_global(&self) -> Result<(), Violation> {
        let tree = self.tree;
        let mut stack = vec![self.top()?];
        let leaves = self.find_leaves();
        let all = tree
            .root()
            .and_then(|r| leaves.get(&r))
            .ok_or(Violation::NoRoot)?;

        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            self.check_links(node)?;
            self.check_nesting(id, node)?;

            let own = leaves.get(&id).ok_or(Violation::UnknownNode { node: id })?;
            let radius = self.cc * self.scale(node.level());
            for &leaf in own {
                let distance = self.dist(id, leaf);
                if distance > radius {
                    return Err(Violation::Covering {
                        node: id,
                        descendant: leaf,
                        distance,
                        radius,
                    });
                }
            }

            let radius = self.cp * self.scale(node.level());
            let nearest_outside = all
                .difference(own)
                .map(|&other| (other, self.dist(id, other)))
                .min_by(|x, y| x.1.total_cmp(&y.1));
            if let Some((other, distance)) = nearest_outside
                && distance <= radius
            {
                return Err(Violation::Packing {
                    a: id,
                    b: other,
                    distance,
                    radius,
                });
            }

            stack.extend(node.children().iter().copied());
        }
        Ok(())
    }

    pub fn is_semi_compressed(&self) -> bool {
        self.semi_compression_violation().is_none()
    }

    /// A node with at most one child is materialised at a level exactly when
    /// some other live node is within relative range there.
    pub fn semi_compression_violation(&self) -> Option<Violation> {
        report(self.check_semi_compressed())
    }

    fn check_semi_compressed(&self) -> Result<(), Violation> {
        for (&level, nodes) in &self.uncomp_levels {
            for &n1 in nodes {
                let node = self.node(n1)?;
                self.check_links(node)?;
                if node.children().len() > 1 {
                    continue;
                }
                let mut relatives = 0;
                for &n2 in nodes.iter().filter(|&&n2| n2 != n1) {
                    let p2 = self.node(n2)?.point();
                    if self.min_level(node.point(), p2) <= Level::Finite(level) {
                        relatives += 1;
                    }
                }
                let at_level = node.level() == Level::Finite(level);
                if (relatives == 0 && at_level) || (relatives > 0 && !at_level) {
                    return Err(Violation::SemiCompression {
                        level,
                        node: n1,
                        relatives,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn relatives_correct(&self) -> bool {
        self.relatives_violation().is_none()
    }

    /// Every pair of nodes live at a level that is at or above their
    /// minimum relative level is linked both ways.
    pub fn relatives_violation(&self) -> Option<Violation> {
        report(self.check_relatives())
    }

    fn check_relatives(&self) -> Result<(), Violation> {
        for (&level, nodes) in &self.uncomp_levels {
            for &a in nodes {
                let node_a = self.node(a)?;
                self.check_links(node_a)?;
                for &b in nodes {
                    if a == b {
                        continue;
                    }
                    let node_b = self.node(b)?;
                    if self.min_level(node_a.point(), node_b.point()) > Level::Finite(level) {
                        continue;
                    }
                    let linked = node_a.relatives().contains(&b) && node_b.relatives().contains(&a);
                    if !linked {
                        return Err(Violation::MissingRelative { level, a, b });
                    }
                }
            }
        }
        Ok(())
    }
}

fn report(check: Result<(), Violation>) -> Option<Violation> {
    let violation = check.err();
    if let Some(v) = &violation {
        log::debug!("net-tree check failed: {}", v);
    }
    violation
}
