//! Convex hull measures used to assign volumes to vertex-defined shapes.

use nalgebra::{Vector2, Vector3};

use crate::errors::{ErrorInfo, HpmcError};

/// Relative tolerance applied when classifying points against a plane.
const PLANE_TOLERANCE: f64 = 1e-9;

/// Returns the vertices of the 2D convex hull in counter-clockwise order.
///
/// Uses Andrew's monotone chain; collinear boundary points are dropped.
pub fn convex_hull_2d(points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut sorted: Vec<Vector2<f64>> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup_by(|a, b| (*a - *b).norm() <= f64::EPSILON);
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Vector2<f64>> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Vector2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Area of the convex hull of `points` (shoelace formula).
pub fn polygon_area(points: &[Vector2<f64>]) -> f64 {
    let hull = convex_hull_2d(points);
    if hull.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, a) in hull.iter().enumerate() {
        let b = &hull[(i + 1) % hull.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    0.5 * twice_area.abs()
}

/// A supporting plane `normal . x = offset` with an outward unit normal.
#[derive(Debug, Clone, Copy)]
struct Facet {
    normal: Vector3<f64>,
    offset: f64,
}

/// Volume of the convex hull of `points`.
///
/// Facets are found by enumerating supporting planes through vertex triples,
/// which keeps coplanar vertex sets (cube faces) as a single facet. The cost
/// is quartic in the vertex count and is meant for particle shapes with tens
/// of vertices.
pub fn polyhedron_volume(points: &[Vector3<f64>]) -> Result<f64, HpmcError> {
    if points.len() < 4 {
        return Err(degenerate_hull(points.len(), "need at least four vertices"));
    }
    let scale = points.iter().map(|p| p.norm()).fold(0.0_f64, f64::max).max(1e-12);
    let tol = PLANE_TOLERANCE * scale;
    let interior = points.iter().sum::<Vector3<f64>>() / points.len() as f64;

    let mut facets: Vec<Facet> = Vec::new();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            for k in (j + 1)..points.len() {
                let raw = (points[j] - points[i]).cross(&(points[k] - points[i]));
                let norm = raw.norm();
                if norm <= tol * scale {
                    continue;
                }
                let mut normal = raw / norm;
                let mut offset = normal.dot(&points[i]);
                let (lo, hi) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
                    let d = normal.dot(p) - offset;
                    (lo.min(d), hi.max(d))
                });
                if hi > tol && lo < -tol {
                    continue;
                }
                if hi > tol {
                    normal = -normal;
                    offset = -offset;
                }
                let duplicate = facets.iter().any(|f| {
                    (f.normal - normal).norm() <= 1e-7 && (f.offset - offset).abs() <= tol
                });
                if !duplicate {
                    facets.push(Facet { normal, offset });
                }
            }
        }
    }

    let mut volume = 0.0;
    for facet in &facets {
        let on_plane: Vec<Vector3<f64>> = points
            .iter()
            .filter(|p| (facet.normal.dot(p) - facet.offset).abs() <= tol)
            .copied()
            .collect();
        let area = planar_area(&on_plane, &facet.normal);
        let height = facet.offset - facet.normal.dot(&interior);
        volume += area * height / 3.0;
    }

    if !(volume.is_finite() && volume > tol * scale * scale) {
        return Err(degenerate_hull(points.len(), "hull encloses no volume"));
    }
    Ok(volume)
}

fn planar_area(points: &[Vector3<f64>], normal: &Vector3<f64>) -> f64 {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);
    let projected: Vec<Vector2<f64>> = points
        .iter()
        .map(|p| Vector2::new(p.dot(&u), p.dot(&v)))
        .collect();
    polygon_area(&projected)
}

fn degenerate_hull(vertex_count: usize, reason: &str) -> HpmcError {
    HpmcError::Geometry(
        ErrorInfo::new("degenerate-hull", reason).with_context("vertices", vertex_count),
    )
}
