//! Thread-safe wrapper for sharing one tree between threads.
//!
//! Insertion is a sequence of in-place mutations over overlapping node
//! neighbourhoods, so every operation here takes one exclusive lock over
//! the whole tree. Distance counting and caching use interior mutability,
//! which rules out shared read locks as well.
//!
//! # Features
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! nettree = { version = "0.1", features = ["sync"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use nettree::{NetTreeConfig, SyncNetTree};
//! use std::thread;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = SyncNetTree::from_config(&NetTreeConfig::default())?;
//! tree.set_root_coords([0.0, 0.0])?;
//!
//! let worker = tree.clone();
//! let handle = thread::spawn(move || worker.insert_coords([3.0, 4.0]).unwrap());
//! tree.insert_coords([-6.0, 8.0])?;
//!
//! handle.join().unwrap();
//! assert_eq!(tree.points_len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::config::{LocatorKind, NetTreeConfig};
use crate::error::Result;
use crate::node::NodeId;
use crate::point::PointId;
use crate::stats::TreeStats;
use crate::tree::NetTree;
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe handle to a [`NetTree`] behind `Arc<Mutex<_>>`.
///
/// Cloning is cheap and every clone refers to the same tree. Operations are
/// serialised; an insertion always completes before the next one starts.
#[derive(Debug, Clone)]
pub struct SyncNetTree {
    inner: Arc<Mutex<NetTree>>,
}

impl SyncNetTree {
    pub fn new(tree: NetTree) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    /// An empty, rootless tree built from `config`.
    pub fn from_config(config: &NetTreeConfig) -> Result<Self> {
        Ok(Self::new(NetTree::from_config(config)?))
    }

    pub fn add_point(&self, coords: impl IntoIterator<Item = f64>) -> Result<PointId> {
        self.inner.lock().add_point(coords)
    }

    pub fn set_root(&self, point: PointId) -> Result<NodeId> {
        self.inner.lock().set_root(point)
    }

    /// Add a point and make it the root, under one lock.
    pub fn set_root_coords(&self, coords: impl IntoIterator<Item = f64>) -> Result<NodeId> {
        let mut tree = self.inner.lock();
        let point = tree.add_point(coords)?;
        tree.set_root(point)
    }

    pub fn construct(&self, points: &[PointId], kind: LocatorKind) -> Result<NodeId> {
        self.inner.lock().construct(points, kind)
    }

    pub fn insert(&self, point: PointId, closest: Option<NodeId>) -> Result<NodeId> {
        self.inner.lock().insert(point, closest)
    }

    /// Add a point and insert it, under one lock.
    pub fn insert_coords(&self, coords: impl IntoIterator<Item = f64>) -> Result<NodeId> {
        let mut tree = self.inner.lock();
        let point = tree.add_point(coords)?;
        tree.insert(point, None)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.inner.lock().root()
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().node_count()
    }

    pub fn points_len(&self) -> usize {
        self.inner.lock().points().len()
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats::of(&self.inner.lock())
    }

    /// Run `f` with exclusive access to the tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut NetTree) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Unwrap the tree if this is the last handle to it.
    pub fn try_into_inner(self) -> std::result::Result<NetTree, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
