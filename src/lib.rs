//! Semi-compressed net-trees over arbitrary metric spaces.
//!
//! A net-tree indexes a finite point set at every scale `tau^level`: each
//! level is a packed, covering net of the one below it, and same-level
//! neighbours are linked as relatives. Trees are built incrementally, with a
//! point-location structure that keeps every pending point's nearest node
//! up to date, and can be checked with [`Verifier`].
//!
//! ```rust
//! use nettree::{NetTreeBuilder, TreeStats, Verifier};
//!
//! let tree = NetTreeBuilder::new()
//!     .tau(2.0)
//!     .cr(4.0)
//!     .points([[0.0], [2.0], [11.0], [28.0]])
//!     .build()?;
//!
//! let ids: Vec<_> = tree.points().ids().collect();
//! let verifier = Verifier::new(&tree, &ids);
//! assert!(verifier.is_local_net_tree());
//! assert!(verifier.is_semi_compressed());
//! assert_eq!(TreeStats::of(&tree).level_count, 6);
//! # Ok::<(), nettree::NetTreeError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod locate;
pub mod metric;
pub mod node;
pub mod point;
pub mod stats;
pub mod tree;
pub mod verify;

#[cfg(feature = "sync")]
pub mod sync;

pub use builder::NetTreeBuilder;
pub use config::{LocatorKind, NetParams, NetTreeConfig};
pub use error::{NetTreeError, Result};
pub use locate::{
    CellLocator, FrontierLocator, NoLocator, PointLocation, SinglePathLocator, TreeView,
};
pub use metric::{Chebyshev, Euclidean, Manhattan, Metric, MetricKind, distance_between};
pub use node::{Level, Node, NodeArena, NodeId};
pub use point::{Point, PointId, PointSet};
pub use stats::TreeStats;
pub use tree::NetTree;
pub use verify::{Verifier, Violation};

#[cfg(feature = "sync")]
pub use sync::SyncNetTree;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{NetTree, NetTreeBuilder, NetTreeError, Result};

    pub use crate::{Level, NodeId, PointId, PointSet};

    pub use crate::{LocatorKind, MetricKind, NetParams, NetTreeConfig};

    pub use crate::{TreeStats, Verifier};

    #[cfg(feature = "sync")]
    pub use crate::SyncNetTree;
}
