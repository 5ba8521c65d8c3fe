//! Tree builder for flexible configuration
//!
//! Collects constants, the metric, the point-location strategy and the
//! points themselves, then constructs the tree in one go.

use crate::config::{LocatorKind, MetricKind, NetTreeConfig};
use crate::error::Result;
use crate::tree::NetTree;
#[cfg(feature = "toml")]
use std::path::PathBuf;

/// Builder for a [`NetTree`] over a fixed point sequence.
///
/// # Examples
///
/// ```rust
/// use nettree::{LocatorKind, NetTreeBuilder, Verifier};
///
/// let tree = NetTreeBuilder::new()
///     .tau(5.0)
///     .locator(LocatorKind::Cells)
///     .points([[25.0], [20.0], [54.0], [30.0], [40.0], [0.0]])
///     .build()?;
///
/// let ids: Vec<_> = tree.points().ids().collect();
/// assert!(Verifier::new(&tree, &ids).is_local_net_tree());
/// # Ok::<(), nettree::NetTreeError>(())
/// ```
#[derive(Debug, Default)]
pub struct NetTreeBuilder {
    config: NetTreeConfig,
    #[cfg(feature = "toml")]
    config_path: Option<PathBuf>,
    rows: Vec<Vec<f64>>,
}

impl NetTreeBuilder {
    /// Create a new builder with the default configuration and no points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: NetTreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file when building. The file
    /// replaces any configuration set on the builder.
    #[cfg(feature = "toml")]
    pub fn config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn tau(mut self, tau: f64) -> Self {
        self.config = self.config.with_tau(tau);
        self
    }

    pub fn cp(mut self, cp: f64) -> Self {
        self.config = self.config.with_cp(cp);
        self
    }

    pub fn cc(mut self, cc: f64) -> Self {
        self.config = self.config.with_cc(cc);
        self
    }

    pub fn cr(mut self, cr: f64) -> Self {
        self.config = self.config.with_cr(cr);
        self
    }

    pub fn metric(mut self, metric: MetricKind) -> Self {
        self.config = self.config.with_metric(metric);
        self
    }

    pub fn locator(mut self, locator: LocatorKind) -> Self {
        self.config = self.config.with_locator(locator);
        self
    }

    pub fn cache_distances(mut self, enabled: bool) -> Self {
        self.config = self.config.with_cache_distances(enabled);
        self
    }

    /// Append one point. The first point added becomes the root.
    pub fn point(mut self, coords: impl IntoIterator<Item = f64>) -> Self {
        self.rows.push(coords.into_iter().collect());
        self
    }

    pub fn points<I, R>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = f64>,
    {
        self.rows
            .extend(rows.into_iter().map(|row| row.into_iter().collect()));
        self
    }

    /// Build the tree. Without points the tree is returned empty and rootless.
    pub fn build(self) -> Result<NetTree> {
        #[cfg(feature = "toml")]
        let config = match &self.config_path {
            Some(path) => NetTreeConfig::from_toml_file(path)?,
            None => self.config,
        };
        #[cfg(not(feature = "toml"))]
        let config = self.config;

        let mut tree = NetTree::from_config(&config)?;
        let ids = self
            .rows
            .into_iter()
            .map(|row| tree.add_point(row))
            .collect::<Result<Vec<_>>>()?;
        if !ids.is_empty() {
            tree.construct(&ids, config.locator)?;
        }
        Ok(tree)
    }
}
