//! Distance functions over coordinate vectors.
//!
//! A [`Metric`] only knows how to measure two coordinate slices. Call
//! counting, the equality fast path and memoisation live one level up in
//! [`PointSet`](crate::point::PointSet), because they are keyed by point
//! handles rather than by coordinate values.
//!
//! - **Euclidean**: straight-line (L2) distance
//! - **Manhattan**: sum of absolute coordinate differences (L1)
//! - **Chebyshev**: largest absolute coordinate difference (L∞)

use crate::error::{NetTreeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A distance function on fixed-length real vectors.
///
/// Implementations must be non-negative and symmetric, and should satisfy
/// the triangle inequality for the net-tree invariants to carry their usual
/// meaning. Callers pass slices of equal length; [`PointSet`] enforces this
/// for stored points and [`distance_between`] checks it for raw slices.
///
/// [`PointSet`]: crate::point::PointSet
pub trait Metric: fmt::Debug + Send + Sync {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    fn name(&self) -> &'static str {
        "Euclidean"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    fn name(&self) -> &'static str {
        "Manhattan"
    }
}

/// The L∞ metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chebyshev;

impl Metric for Chebyshev {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    fn name(&self) -> &'static str {
        "Chebyshev"
    }
}

/// Metric selector used by configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Euclidean,
    Manhattan,
    /// Also accepted as `linfinity` in configuration files.
    #[serde(alias = "linfinity")]
    Chebyshev,
}

impl MetricKind {
    /// Instantiate the selected metric.
    pub fn build(self) -> Box<dyn Metric> {
        match self {
            MetricKind::Euclidean => Box::new(Euclidean),
            MetricKind::Manhattan => Box::new(Manhattan),
            MetricKind::Chebyshev => Box::new(Chebyshev),
        }
    }
}

/// Distance between two coordinate slices under the selected metric.
///
/// Fails with [`NetTreeError::DimensionMismatch`] when the slices differ in
/// length.
///
/// # Examples
///
/// ```rust
/// use nettree::metric::{distance_between, MetricKind};
///
/// let a = [0.0, 0.0];
/// let b = [3.0, 4.0];
/// assert_eq!(distance_between(&a, &b, MetricKind::Euclidean)?, 5.0);
/// assert_eq!(distance_between(&a, &b, MetricKind::Manhattan)?, 7.0);
/// assert_eq!(distance_between(&a, &b, MetricKind::Chebyshev)?, 4.0);
/// # Ok::<(), nettree::NetTreeError>(())
/// ```
pub fn distance_between(a: &[f64], b: &[f64], kind: MetricKind) -> Result<f64> {
    if a.len() != b.len() {
        return Err(NetTreeError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(match kind {
        MetricKind::Euclidean => Euclidean.distance(a, b),
        MetricKind::Manhattan => Manhattan.distance(a, b),
        MetricKind::Chebyshev => Chebyshev.distance(a, b),
    })
}
