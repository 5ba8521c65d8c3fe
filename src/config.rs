//! Tree constants and configuration.
//!
//! [`NetTreeConfig`] is the serializable form read from JSON or TOML.
//! [`NetParams`] is the validated, copyable set of constants the tree and
//! its point-location structures actually compute with.

use crate::error::{NetTreeError, Result};
use crate::node::Level;
use serde::{Deserialize, Serialize};

pub use crate::metric::MetricKind;

/// Which point-location structure a tree builds during `construct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Inner/outer cells per node, updated incrementally.
    #[default]
    Cells,
    /// Greedy descent along one path from the root.
    SinglePath,
    /// Level-by-level descent keeping every candidate within relative radius.
    Frontier,
    /// No point location; insertions start from the root.
    None,
}

/// Net-tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetTreeConfig {
    /// Scale factor between consecutive levels, must exceed 1
    #[serde(default = "NetTreeConfig::default_tau")]
    pub tau: f64,

    /// Packing constant
    #[serde(default = "NetTreeConfig::default_cp")]
    pub cp: f64,

    /// Covering constant
    #[serde(default = "NetTreeConfig::default_cc")]
    pub cc: f64,

    /// Relative constant. Derived from `tau` and `cc` when absent.
    #[serde(default)]
    pub cr: Option<f64>,

    #[serde(default)]
    pub metric: MetricKind,

    /// Memoise pairwise distances by point handle
    #[serde(default)]
    pub cache_distances: bool,

    #[serde(default)]
    pub locator: LocatorKind,
}

impl NetTreeConfig {
    const fn default_tau() -> f64 {
        5.0
    }

    const fn default_cp() -> f64 {
        1.0
    }

    const fn default_cc() -> f64 {
        1.0
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_cp(mut self, cp: f64) -> Self {
        self.cp = cp;
        self
    }

    pub fn with_cc(mut self, cc: f64) -> Self {
        self.cc = cc;
        self
    }

    pub fn with_cr(mut self, cr: f64) -> Self {
        self.cr = Some(cr);
        self
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_cache_distances(mut self, enabled: bool) -> Self {
        self.cache_distances = enabled;
        self
    }

    pub fn with_locator(mut self, locator: LocatorKind) -> Self {
        self.locator = locator;
        self
    }

    /// Validated constants for this configuration.
    pub fn params(&self) -> Result<NetParams> {
        NetParams::new(self.tau, self.cp, self.cc, self.cr)
    }

    /// The effective relative constant, given or derived.
    pub fn relative_constant(&self) -> Result<f64> {
        Ok(self.params()?.cr)
    }

    pub fn validate(&self) -> Result<()> {
        self.params().map(|_| ())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: NetTreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: NetTreeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NetTreeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for NetTreeConfig {
    fn default() -> Self {
        Self {
            tau: Self::default_tau(),
            cp: Self::default_cp(),
            cc: Self::default_cc(),
            cr: None,
            metric: MetricKind::default(),
            cache_distances: false,
            locator: LocatorKind::default(),
        }
    }
}

/// Validated tree constants: `tau > 1`, `cp > 0`, `cc > 0`, `0 < cr < inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetParams {
    pub tau: f64,
    pub cp: f64,
    pub cc: f64,
    pub cr: f64,
}

impl NetParams {
    /// Check the constants and derive `cr` when it is not given.
    ///
    /// The derived value is `max(2·cc·tau/(tau−4), cc·tau)`.
    pub fn new(tau: f64, cp: f64, cc: f64, cr: Option<f64>) -> Result<Self> {
        if !tau.is_finite() || tau <= 1.0 {
            return Err(NetTreeError::InvalidConstant(format!(
                "tau must be a finite number greater than 1, got: {}",
                tau
            )));
        }
        if !cp.is_finite() || cp <= 0.0 {
            return Err(NetTreeError::InvalidConstant(format!(
                "cp must be a finite positive number, got: {}",
                cp
            )));
        }
        if !cc.is_finite() || cc <= 0.0 {
            return Err(NetTreeError::InvalidConstant(format!(
                "cc must be a finite positive number, got: {}",
                cc
            )));
        }

        let cr = match cr {
            Some(cr) => cr,
            None => {
                if tau <= 4.0 {
                    log::warn!(
                        "tau = {} with a derived relative constant; relative links are \
                         only guaranteed complete for tau > 4",
                        tau
                    );
                }
                let first = if tau == 4.0 {
                    f64::INFINITY
                } else {
                    2.0 * cc * tau / (tau - 4.0)
                };
                first.max(cc * tau)
            }
        };
        if !cr.is_finite() || cr <= 0.0 {
            return Err(NetTreeError::InvalidConstant(format!(
                "relative constant must be finite and positive, got: {} (tau = {})",
                cr, tau
            )));
        }

        Ok(Self { tau, cp, cc, cr })
    }

    /// `tau^level`, with `0` at `-inf` and `inf` at `+inf`.
    pub fn scale(&self, level: Level) -> f64 {
        match level {
            Level::NegInf => 0.0,
            Level::Finite(l) => self.tau.powi(l),
            Level::PosInf => f64::INFINITY,
        }
    }

    /// Lowest level at which two points `d` apart can be relatives.
    pub fn min_level(&self, d: f64) -> Level {
        if d == 0.0 {
            return Level::NegInf;
        }
        let mut level = ((d / self.cr).ln() / self.tau.ln()).ceil() as i32;
        if d <= self.cr * self.tau.powi(level - 1) {
            level -= 1;
        }
        Level::Finite(level)
    }

    /// `cr·tau^level`
    pub fn rel_radius(&self, level: Level) -> f64 {
        self.cr * self.scale(level)
    }

    /// `cc·tau^(level+1)`
    pub fn cover_radius(&self, level: Level) -> f64 {
        self.cc * self.scale(level.up())
    }

    /// `cp·tau^level`
    pub fn pack_radius(&self, level: Level) -> f64 {
        self.cp * self.scale(level)
    }

    /// Radius of a node's inner cell, `cp·tau^(level−1)/2`.
    pub fn inner_radius(&self, level: Level) -> f64 {
        self.cp * self.scale(level.down()) / 2.0
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            tau: NetTreeConfig::default_tau(),
            cp: NetTreeConfig::default_cp(),
            cc: NetTreeConfig::default_cc(),
            cr: 10.0,
        }
    }
}
