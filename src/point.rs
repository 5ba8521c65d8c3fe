//! Points and the metric they are measured with.
//!
//! Points are immutable coordinate vectors stored in a [`PointSet`] and
//! addressed by stable [`PointId`] handles. The set owns the metric, so the
//! whole collection is rebound at once with [`PointSet::set_metric`].

use crate::error::{NetTreeError, Result};
use crate::metric::{Metric, MetricKind};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Index;

/// Stable handle of a point inside a [`PointSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(u32);

impl PointId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A fixed-length coordinate vector. Equality compares coordinates only.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    coords: SmallVec<[f64; 4]>,
}

impl Point {
    pub fn new(coords: impl IntoIterator<Item = f64>) -> Self {
        Self {
            coords: coords.into_iter().collect(),
        }
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }
}

impl Index<usize> for Point {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.coords[index]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// All points known to a tree, bound to a single metric.
///
/// Distances between two handles go through [`PointSet::dist`], which
/// short-circuits equal coordinates to `0`, counts every metric evaluation
/// and optionally memoises results per handle pair.
#[derive(Debug)]
pub struct PointSet {
    points: Vec<Point>,
    dim: Option<usize>,
    metric: Box<dyn Metric>,
    cache_enabled: bool,
    cache: RefCell<FxHashMap<(PointId, PointId), f64>>,
    counter: Cell<u64>,
}

impl PointSet {
    pub fn new(metric: Box<dyn Metric>) -> Self {
        Self {
            points: Vec::new(),
            dim: None,
            metric,
            cache_enabled: false,
            cache: RefCell::new(FxHashMap::default()),
            counter: Cell::new(0),
        }
    }

    pub fn with_kind(kind: MetricKind) -> Self {
        Self::new(kind.build())
    }

    /// Enable or disable memoisation of computed distances.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self.cache.get_mut().clear();
        self
    }

    /// Build a set from coordinate rows, returning the handles in row order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nettree::metric::MetricKind;
    /// use nettree::point::PointSet;
    ///
    /// let (points, ids) = PointSet::from_rows(MetricKind::Euclidean, [[0.0, 0.0], [3.0, 4.0]])?;
    /// assert_eq!(points.dist(ids[0], ids[1]), 5.0);
    /// # Ok::<(), nettree::NetTreeError>(())
    /// ```
    pub fn from_rows<I, R>(kind: MetricKind, rows: I) -> Result<(Self, Vec<PointId>)>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = f64>,
    {
        let mut set = Self::with_kind(kind);
        let ids = set.extend(rows)?;
        Ok((set, ids))
    }

    /// Add a point. The first point fixes the dimension of the set.
    pub fn push(&mut self, coords: impl IntoIterator<Item = f64>) -> Result<PointId> {
        let point = Point::new(coords);

        if let Some(bad) = point.coords().iter().find(|c| !c.is_finite()) {
            return Err(NetTreeError::InvalidInput(format!(
                "coordinates must be finite, got: {}",
                bad
            )));
        }

        match self.dim {
            Some(expected) if expected != point.dim() => {
                return Err(NetTreeError::DimensionMismatch {
                    expected,
                    found: point.dim(),
                });
            }
            None if point.dim() == 0 => {
                return Err(NetTreeError::InvalidInput(
                    "points need at least one coordinate".into(),
                ));
            }
            None => self.dim = Some(point.dim()),
            _ => {}
        }

        let id = PointId::new(self.points.len());
        self.points.push(point);
        Ok(id)
    }

    pub fn extend<I, R>(&mut self, rows: I) -> Result<Vec<PointId>>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = f64>,
    {
        rows.into_iter().map(|row| self.push(row)).collect()
    }

    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.index())
    }

    pub fn contains(&self, id: PointId) -> bool {
        id.index() < self.points.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = PointId> + '_ {
        (0..self.points.len()).map(PointId::new)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn metric(&self) -> &dyn Metric {
        self.metric.as_ref()
    }

    /// Rebind every point to another metric. Cached distances are dropped.
    pub fn set_metric(&mut self, metric: Box<dyn Metric>) {
        log::debug!(
            "rebinding {} points from {} to {}",
            self.points.len(),
            self.metric.name(),
            metric.name()
        );
        self.metric = metric;
        self.cache.get_mut().clear();
    }

    /// Whether two handles carry equal coordinates.
    pub fn same(&self, a: PointId, b: PointId) -> bool {
        a == b || self.points[a.index()] == self.points[b.index()]
    }

    /// Distance between two points of this set.
    pub fn dist(&self, a: PointId, b: PointId) -> f64 {
        if self.same(a, b) {
            return 0.0;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if self.cache_enabled {
            if let Some(&d) = self.cache.borrow().get(&key) {
                return d;
            }
        }

        let d = self
            .metric
            .distance(self.points[a.index()].coords(), self.points[b.index()].coords());
        self.counter.set(self.counter.get() + 1);

        if self.cache_enabled {
            self.cache.borrow_mut().insert(key, d);
        }
        d
    }

    /// Minimum distance from `first` to any of `others`.
    pub fn min_dist(&self, first: PointId, others: &[PointId]) -> Result<f64> {
        if others.is_empty() {
            return Err(NetTreeError::InsufficientArguments(
                "min_dist needs at least one other point".into(),
            ));
        }
        Ok(others
            .iter()
            .map(|&other| self.dist(first, other))
            .fold(f64::INFINITY, f64::min))
    }

    /// Number of metric evaluations since creation or the last reset.
    pub fn counter(&self) -> u64 {
        self.counter.get()
    }

    /// Zero the evaluation counter and clear cached distances.
    pub fn reset_counter(&self) {
        self.counter.set(0);
        self.cache.borrow_mut().clear();
    }
}

impl Index<PointId> for PointSet {
    type Output = Point;

    fn index(&self, id: PointId) -> &Point {
        &self.points[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Chebyshev, Manhattan};

    #[test]
    fn test_point_indexing() {
        let p = Point::new([3.0, 5.0, 1.0]);
        assert_eq!(p[0], 3.0);
        assert_eq!(p[1], 5.0);
        assert_eq!(p[2], 1.0);
        assert_eq!(p.dim(), 3);
        assert_eq!(p.to_string(), "(3, 5, 1)");
    }

    #[test]
    fn test_distances_and_counter() {
        let (mut set, ids) =
            PointSet::from_rows(MetricKind::Euclidean, [[0.0, 0.0], [3.0, 4.0], [12.0, 5.0]])
                .unwrap();
        let (p, q, r) = (ids[0], ids[1], ids[2]);

        assert_eq!(set.dist(p, q), set.dist(q, p));
        assert_eq!(set.dist(p, q), 5.0);
        assert_eq!(set.dist(p, r), 13.0);
        assert_eq!(set.min_dist(p, &[q, r]).unwrap(), 5.0);
        assert_eq!(set.counter(), 6);

        set.set_metric(Box::new(Manhattan));
        assert_eq!(set.dist(p, q), 7.0);
        assert_eq!(set.dist(p, r), 17.0);
        assert_eq!(set.min_dist(p, &[q, r]).unwrap(), 7.0);

        set.set_metric(Box::new(Chebyshev));
        assert_eq!(set.dist(p, q), 4.0);
        assert_eq!(set.dist(p, r), 12.0);
        assert_eq!(set.min_dist(p, &[q, r]).unwrap(), 4.0);
    }

    #[test]
    fn test_equal_points_skip_metric() {
        let (set, ids) =
            PointSet::from_rows(MetricKind::Euclidean, [[1.0, 1.0], [1.0, 1.0]]).unwrap();
        assert_eq!(set.dist(ids[0], ids[1]), 0.0);
        assert_eq!(set.dist(ids[0], ids[0]), 0.0);
        assert_eq!(set.counter(), 0);
        assert!(set.same(ids[0], ids[1]));
    }

    #[test]
    fn test_cache_avoids_recomputation() {
        let mut set = PointSet::with_kind(MetricKind::Euclidean).with_cache(true);
        let a = set.push([0.0]).unwrap();
        let b = set.push([2.0]).unwrap();

        assert_eq!(set.dist(a, b), 2.0);
        assert_eq!(set.dist(b, a), 2.0);
        assert_eq!(set.counter(), 1);

        set.reset_counter();
        assert_eq!(set.counter(), 0);
        assert_eq!(set.dist(a, b), 2.0);
        assert_eq!(set.counter(), 1);
    }

    #[test]
    fn test_min_dist_requires_others() {
        let (set, ids) = PointSet::from_rows(MetricKind::Euclidean, [[0.0]]).unwrap();
        assert!(matches!(
            set.min_dist(ids[0], &[]),
            Err(NetTreeError::InsufficientArguments(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut set = PointSet::with_kind(MetricKind::Euclidean);
        set.push([0.0, 1.0]).unwrap();
        assert_eq!(
            set.push([0.0, 1.0, 2.0]),
            Err(NetTreeError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        assert!(matches!(
            set.push([f64::NAN, 1.0]),
            Err(NetTreeError::InvalidInput(_))
        ));
        assert_eq!(set.len(), 1);
    }
}
