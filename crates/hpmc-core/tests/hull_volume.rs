use std::f64::consts::PI;

use hpmc_core::geometry::Dimensions;
use hpmc_core::hull::{convex_hull_2d, polygon_area, polyhedron_volume};
use hpmc_core::{HpmcError, Shape};
use nalgebra::{UnitQuaternion, Vector2, Vector3};

fn tetrahedron() -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(1.0, -1.0, -1.0),
        Vector3::new(-1.0, 1.0, -1.0),
        Vector3::new(-1.0, -1.0, 1.0),
    ]
}

#[test]
fn unit_cube_has_unit_volume() {
    let cube = Shape::cube(1.0);
    let volume = cube.volume(Dimensions::Three).unwrap();
    assert!((volume - 1.0).abs() < 1e-12);
}

#[test]
fn interior_vertices_do_not_change_the_volume() {
    let Shape::ConvexPolyhedron { mut vertices } = Shape::cube(2.0) else {
        unreachable!()
    };
    vertices.push(Vector3::new(0.1, -0.2, 0.3));
    assert!((polyhedron_volume(&vertices).unwrap() - 8.0).abs() < 1e-10);
}

#[test]
fn tetrahedron_volume_is_rotation_invariant() {
    let base = polyhedron_volume(&tetrahedron()).unwrap();
    assert!((base - 8.0 / 3.0).abs() < 1e-12);

    let rotation = UnitQuaternion::from_euler_angles(0.3, -1.1, 2.2);
    let rotated: Vec<Vector3<f64>> = tetrahedron()
        .iter()
        .map(|v| rotation.transform_vector(v))
        .collect();
    assert!((polyhedron_volume(&rotated).unwrap() - base).abs() < 1e-10);
}

#[test]
fn coplanar_vertices_are_degenerate() {
    let flat = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
    ];
    let err = polyhedron_volume(&flat).unwrap_err();
    assert!(matches!(err, HpmcError::Geometry(_)));
    assert_eq!(err.info().code, "degenerate-hull");
}

#[test]
fn polygon_hull_drops_interior_points() {
    let points = vec![
        Vector2::new(-0.5, -0.5),
        Vector2::new(0.5, -0.5),
        Vector2::new(0.0, 0.0),
        Vector2::new(0.5, 0.5),
        Vector2::new(-0.5, 0.5),
    ];
    assert_eq!(convex_hull_2d(&points).len(), 4);
    assert!((polygon_area(&points) - 1.0).abs() < 1e-12);
}

#[test]
fn analytic_shape_volumes() {
    let sphere = Shape::sphere(1.0);
    assert!((sphere.volume(Dimensions::Three).unwrap() - PI / 6.0).abs() < 1e-12);
    assert!((sphere.volume(Dimensions::Two).unwrap() - PI / 4.0).abs() < 1e-12);

    let ellipsoid = Shape::Ellipsoid {
        a: 1.0,
        b: 2.0,
        c: 0.5,
    };
    assert!((ellipsoid.volume(Dimensions::Three).unwrap() - 4.0 * PI / 3.0).abs() < 1e-12);
}

#[test]
fn dimensionality_mismatch_is_a_configuration_error() {
    let ellipsoid = Shape::Ellipsoid {
        a: 1.0,
        b: 1.0,
        c: 1.0,
    };
    let err = ellipsoid.volume(Dimensions::Two).unwrap_err();
    assert!(matches!(err, HpmcError::Configuration(_)));
    assert_eq!(err.info().code, "dimension-mismatch");

    let square = Shape::polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    assert!(square.validate(Dimensions::Three).is_err());
    assert!((square.volume(Dimensions::Two).unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn too_few_vertices_fail_validation() {
    let triangle = Shape::polyhedron(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let err = triangle.validate(Dimensions::Three).unwrap_err();
    assert_eq!(err.info().code, "invalid-shape");
}

#[test]
fn shapes_roundtrip_through_json() {
    let shape = Shape::cube(1.5);
    let json = serde_json::to_string(&shape).unwrap();
    assert!(json.contains("\"kind\":\"convex_polyhedron\""));
    let back: Shape = serde_json::from_str(&json).unwrap();
    assert_eq!(back, shape);
}
