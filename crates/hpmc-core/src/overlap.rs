//! Pairwise hard-particle overlap tests.
//!
//! [`OverlapOracle`] is the seam the estimators and the shape updater use to
//! ask whether two placed shapes intersect. [`ConvexOverlap`] answers it for
//! every built-in shape with a closest-point GJK search on the Minkowski
//! difference, short-circuiting sphere pairs and pairs whose circumspheres are
//! disjoint.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::errors::{ErrorInfo, HpmcError};
use crate::geometry::{Dimensions, Pose};
use crate::shape::{Shape, ShapeKind};

/// Upper bound on GJK refinements before a pair is reported as overlapping.
pub const MAX_GJK_ITERATIONS: usize = 64;

/// Distance, relative to the summed circumradii, below which two convex
/// shapes count as touching-or-overlapping.
const CONTACT_TOLERANCE: f64 = 1e-12;

/// Decides whether two placed shapes overlap.
///
/// Touching spheres do not overlap; other convex pairs closer than a relative
/// tolerance of `1e-12` do. Implementations must be symmetric in their
/// arguments and must never panic on shapes they report as supported.
pub trait OverlapOracle: Send + Sync {
    /// Returns true when the oracle has a test for the given kinds in `dims`.
    fn supports(&self, a: ShapeKind, b: ShapeKind, dims: Dimensions) -> bool;

    /// Returns true when `a` placed at `pose_a` and `b` placed at `pose_b` intersect.
    fn overlaps(
        &self,
        a: &Shape,
        pose_a: &Pose,
        b: &Shape,
        pose_b: &Pose,
        dims: Dimensions,
    ) -> Result<bool, HpmcError>;
}

/// Overlap oracle for convex shapes built on the GJK intersection test.
#[derive(Debug, Clone, Copy)]
pub struct ConvexOverlap {
    max_iterations: usize,
}

impl Default for ConvexOverlap {
    fn default() -> Self {
        Self {
            max_iterations: MAX_GJK_ITERATIONS,
        }
    }
}

impl ConvexOverlap {
    /// Creates an oracle with the default iteration cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }
}

impl OverlapOracle for ConvexOverlap {
    fn supports(&self, a: ShapeKind, b: ShapeKind, dims: Dimensions) -> bool {
        a.fits(dims) && b.fits(dims)
    }

    fn overlaps(
        &self,
        a: &Shape,
        pose_a: &Pose,
        b: &Shape,
        pose_b: &Pose,
        dims: Dimensions,
    ) -> Result<bool, HpmcError> {
        if !self.supports(a.kind(), b.kind(), dims) {
            return Err(HpmcError::UnsupportedCombination(
                ErrorInfo::new("no-overlap-test", "no overlap test for this shape pair")
                    .with_context("a", a.kind().as_str())
                    .with_context("b", b.kind().as_str())
                    .with_context("dimensions", dims.as_usize()),
            ));
        }

        let separation = pose_b.position - pose_a.position;
        let distance = separation.norm();
        let reach = a.circumsphere_radius() + b.circumsphere_radius();
        if distance >= reach {
            return Ok(false);
        }
        if let (Shape::Sphere { diameter: da }, Shape::Sphere { diameter: db }) = (a, b) {
            return Ok(distance < (da + db) / 2.0);
        }

        let pair = PlacedPair {
            a,
            pose_a,
            b,
            pose_b,
        };
        Ok(gjk(&pair, separation, dims, self.max_iterations, reach))
    }
}

struct PlacedPair<'a> {
    a: &'a Shape,
    pose_a: &'a Pose,
    b: &'a Shape,
    pose_b: &'a Pose,
}

impl PlacedPair<'_> {
    /// Support point of the Minkowski difference `A - B` along `direction`.
    fn support(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        let on_a = placed_support(self.a, self.pose_a, direction);
        let on_b = placed_support(self.b, self.pose_b, &(-direction));
        on_a - on_b
    }
}

fn placed_support(shape: &Shape, pose: &Pose, direction: &Vector3<f64>) -> Vector3<f64> {
    let local = pose.orientation.inverse_transform_vector(direction);
    pose.position + pose.orientation.transform_vector(&shape.support(&local))
}

/// Closest-point GJK on the Minkowski difference `A - B`.
///
/// `v` is always a convex combination of support points, so it lies inside
/// `A - B`; the pair is reported separated only once `-v` is a separating
/// direction. Each iteration strictly lowers `|v|`, which rules out cycling.
fn gjk(
    pair: &PlacedPair<'_>,
    separation: Vector3<f64>,
    dims: Dimensions,
    max_iterations: usize,
    scale: f64,
) -> bool {
    let support = |direction: &Vector3<f64>| {
        let mut point = pair.support(direction);
        if dims == Dimensions::Two {
            point.z = 0.0;
        }
        point
    };
    let start = if separation.norm_squared() > 0.0 {
        separation
    } else {
        Vector3::x()
    };
    let tolerance = (CONTACT_TOLERANCE * scale).powi(2);
    let mut v = support(&start);
    let mut simplex: Vec<Vector3<f64>> = Vec::with_capacity(4);

    for _ in 0..max_iterations {
        if v.norm_squared() <= tolerance {
            return true;
        }
        let w = support(&(-v));
        if v.dot(&w) > 0.0 {
            return false;
        }
        simplex.push(w);
        let (closest, reduced) = closest_on_simplex(&simplex);
        v = closest;
        simplex = reduced;
    }
    // no separating plane found
    true
}

/// Point of the convex hull of `points` nearest the origin, together with the
/// smallest subset of `points` whose hull still contains it.
fn closest_on_simplex(points: &[Vector3<f64>]) -> (Vector3<f64>, Vec<Vector3<f64>>) {
    let mut best = (f64::INFINITY, Vector3::zeros(), Vec::new());
    for mask in 1..(1usize << points.len()) {
        let subset: Vec<Vector3<f64>> = points
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, p)| *p)
            .collect();
        let Some(weights) = affine_projection(&subset) else {
            continue;
        };
        let point = subset
            .iter()
            .zip(&weights)
            .fold(Vector3::zeros(), |acc, (p, w)| acc + p * *w);
        let distance = point.norm_squared();
        if distance < best.0 {
            let support = subset
                .iter()
                .zip(&weights)
                .filter(|(_, w)| **w > 0.0)
                .map(|(p, _)| *p)
                .collect();
            best = (distance, point, support);
        }
    }
    (best.1, best.2)
}

/// Barycentric weights of the origin's projection onto the affine hull of
/// `subset`, or `None` when the projection falls outside the simplex or the
/// hull is degenerate.
fn affine_projection(subset: &[Vector3<f64>]) -> Option<Vec<f64>> {
    let (&base, rest) = subset.split_first()?;
    if rest.is_empty() {
        return Some(vec![1.0]);
    }
    let edges: Vec<Vector3<f64>> = rest.iter().map(|p| p - base).collect();
    let m = edges.len();
    let gram = DMatrix::from_fn(m, m, |i, j| edges[i].dot(&edges[j]));
    let rhs = DVector::from_fn(m, |i, _| -base.dot(&edges[i]));
    let mu = gram.lu().solve(&rhs)?;
    let mut weights = Vec::with_capacity(m + 1);
    weights.push(1.0 - mu.sum());
    weights.extend(mu.iter().copied());
    weights
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
        .then_some(weights)
}
