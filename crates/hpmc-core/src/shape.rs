//! Per-type particle shapes and their derived measures.

use std::f64::consts::PI;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HpmcError};
use crate::geometry::Dimensions;
use crate::hull;

/// Family a [`Shape`] belongs to; overlap and move implementations dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// Sphere in 3D, disk in 2D.
    Sphere,
    /// Axis-aligned ellipsoid in the particle frame.
    Ellipsoid,
    /// Convex hull of a 3D vertex set.
    ConvexPolyhedron,
    /// Convex hull of a 2D vertex set.
    ConvexPolygon,
}

impl ShapeKind {
    /// Stable label used in error contexts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Ellipsoid => "ellipsoid",
            ShapeKind::ConvexPolyhedron => "convex_polyhedron",
            ShapeKind::ConvexPolygon => "convex_polygon",
        }
    }

    /// Returns true when the kind can be placed in a box of dimensionality `dims`.
    pub fn fits(&self, dims: Dimensions) -> bool {
        match self {
            ShapeKind::Sphere => true,
            ShapeKind::Ellipsoid | ShapeKind::ConvexPolyhedron => dims == Dimensions::Three,
            ShapeKind::ConvexPolygon => dims == Dimensions::Two,
        }
    }
}

/// Geometric descriptor shared by every particle of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Sphere (disk in 2D) of the given diameter.
    Sphere {
        /// Diameter of the sphere.
        diameter: f64,
    },
    /// Ellipsoid with principal semi-axes along the particle frame axes.
    Ellipsoid {
        /// Semi-axis along x.
        a: f64,
        /// Semi-axis along y.
        b: f64,
        /// Semi-axis along z.
        c: f64,
    },
    /// Convex polyhedron given by its vertices in the particle frame.
    ConvexPolyhedron {
        /// Vertex coordinates; the shape is their convex hull.
        vertices: Vec<Vector3<f64>>,
    },
    /// Convex polygon given by its vertices in the particle frame.
    ConvexPolygon {
        /// Vertex coordinates; the shape is their convex hull.
        vertices: Vec<Vector2<f64>>,
    },
}

impl Shape {
    /// Convenience constructor for a sphere.
    pub fn sphere(diameter: f64) -> Self {
        Shape::Sphere { diameter }
    }

    /// Convenience constructor for a polyhedron from raw coordinates.
    pub fn polyhedron(vertices: &[[f64; 3]]) -> Self {
        Shape::ConvexPolyhedron {
            vertices: vertices
                .iter()
                .map(|v| Vector3::new(v[0], v[1], v[2]))
                .collect(),
        }
    }

    /// Convenience constructor for a polygon from raw coordinates.
    pub fn polygon(vertices: &[[f64; 2]]) -> Self {
        Shape::ConvexPolygon {
            vertices: vertices.iter().map(|v| Vector2::new(v[0], v[1])).collect(),
        }
    }

    /// Axis-aligned cube of edge `edge` centred on the origin.
    pub fn cube(edge: f64) -> Self {
        let h = edge / 2.0;
        let mut vertices = Vec::with_capacity(8);
        for &x in &[-h, h] {
            for &y in &[-h, h] {
                for &z in &[-h, h] {
                    vertices.push(Vector3::new(x, y, z));
                }
            }
        }
        Shape::ConvexPolyhedron { vertices }
    }

    /// Returns the shape family.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Ellipsoid { .. } => ShapeKind::Ellipsoid,
            Shape::ConvexPolyhedron { .. } => ShapeKind::ConvexPolyhedron,
            Shape::ConvexPolygon { .. } => ShapeKind::ConvexPolygon,
        }
    }

    /// Checks parameter sanity and that the shape fits a box of dimensionality `dims`.
    pub fn validate(&self, dims: Dimensions) -> Result<(), HpmcError> {
        if !self.kind().fits(dims) {
            return Err(HpmcError::Configuration(
                ErrorInfo::new(
                    "dimension-mismatch",
                    "shape kind does not match the box dimensionality",
                )
                .with_context("kind", self.kind().as_str())
                .with_context("dimensions", dims.as_usize()),
            ));
        }
        let invalid = |reason: &str| {
            HpmcError::Configuration(
                ErrorInfo::new("invalid-shape", reason.to_string())
                    .with_context("kind", self.kind().as_str()),
            )
        };
        match self {
            Shape::Sphere { diameter } => {
                if !diameter.is_finite() || *diameter < 0.0 {
                    return Err(invalid("diameter must be finite and non-negative"));
                }
            }
            Shape::Ellipsoid { a, b, c } => {
                if [a, b, c].iter().any(|v| !v.is_finite() || **v <= 0.0) {
                    return Err(invalid("semi-axes must be finite and positive"));
                }
            }
            Shape::ConvexPolyhedron { vertices } => {
                if vertices.len() < 4 {
                    return Err(invalid("a polyhedron needs at least four vertices"));
                }
                if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
                    return Err(invalid("vertex coordinates must be finite"));
                }
            }
            Shape::ConvexPolygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(invalid("a polygon needs at least three vertices"));
                }
                if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
                    return Err(invalid("vertex coordinates must be finite"));
                }
            }
        }
        Ok(())
    }

    /// Volume of the shape (area in 2D).
    pub fn volume(&self, dims: Dimensions) -> Result<f64, HpmcError> {
        self.validate(dims)?;
        let volume = match self {
            Shape::Sphere { diameter } => match dims {
                Dimensions::Two => PI * diameter * diameter / 4.0,
                Dimensions::Three => PI * diameter.powi(3) / 6.0,
            },
            Shape::Ellipsoid { a, b, c } => 4.0 * PI * a * b * c / 3.0,
            Shape::ConvexPolyhedron { vertices } => hull::polyhedron_volume(vertices)?,
            Shape::ConvexPolygon { vertices } => {
                let area = hull::polygon_area(vertices);
                if area <= 0.0 {
                    return Err(HpmcError::geometry(
                        "degenerate-hull",
                        "polygon encloses no area",
                    ));
                }
                area
            }
        };
        Ok(volume)
    }

    /// Radius of the smallest origin-centred sphere containing the shape.
    pub fn circumsphere_radius(&self) -> f64 {
        match self {
            Shape::Sphere { diameter } => diameter / 2.0,
            Shape::Ellipsoid { a, b, c } => a.max(*b).max(*c),
            Shape::ConvexPolyhedron { vertices } => {
                vertices.iter().map(|v| v.norm()).fold(0.0, f64::max)
            }
            Shape::ConvexPolygon { vertices } => {
                vertices.iter().map(|v| v.norm()).fold(0.0, f64::max)
            }
        }
    }

    /// Support point of the shape in its own frame along `direction`.
    pub fn support(&self, direction: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Shape::Sphere { diameter } => {
                let norm = direction.norm();
                if norm == 0.0 {
                    Vector3::new(diameter / 2.0, 0.0, 0.0)
                } else {
                    direction * (diameter / 2.0 / norm)
                }
            }
            Shape::Ellipsoid { a, b, c } => {
                let scaled = Vector3::new(a * direction.x, b * direction.y, c * direction.z);
                let norm = scaled.norm();
                if norm == 0.0 {
                    Vector3::new(*a, 0.0, 0.0)
                } else {
                    Vector3::new(a * scaled.x, b * scaled.y, c * scaled.z) / norm
                }
            }
            Shape::ConvexPolyhedron { vertices } => vertices
                .iter()
                .copied()
                .max_by(|p, q| {
                    p.dot(direction)
                        .partial_cmp(&q.dot(direction))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or_else(Vector3::zeros),
            Shape::ConvexPolygon { vertices } => vertices
                .iter()
                .map(|v| Vector3::new(v.x, v.y, 0.0))
                .max_by(|p, q| {
                    p.dot(direction)
                        .partial_cmp(&q.dot(direction))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or_else(Vector3::zeros),
        }
    }
}
