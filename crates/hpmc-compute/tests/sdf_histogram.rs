use hpmc_compute::{Sdf, SdfConfig, SdfHistogram};
use hpmc_core::{ConvexOverlap, Dimensions, HpmcError, Shape, SimBox, SystemState};
use nalgebra::{UnitQuaternion, Vector3};

fn pair_system(sim_box: SimBox, shape: Shape, separation: Vector3<f64>) -> SystemState {
    let mut system = SystemState::new(sim_box, ["A"])
        .unwrap()
        .with_shape(0, shape)
        .unwrap();
    system
        .add_particle(0, -separation / 2.0, UnitQuaternion::identity())
        .unwrap();
    system
        .add_particle(0, separation / 2.0, UnitQuaternion::identity())
        .unwrap();
    system
}

fn sdf() -> Sdf {
    Sdf::new(SdfConfig::default()).unwrap()
}

fn occupied_bins(histogram: &SdfHistogram) -> Vec<(usize, u64)> {
    histogram
        .counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .map(|(k, &c)| (k, c))
        .collect()
}

#[test]
fn default_range_has_two_hundred_bins() {
    assert_eq!(SdfConfig::default().bin_count(), 200);
    let histogram = SdfHistogram::undefined(0.02, 1e-4, Dimensions::Three);
    assert_eq!(histogram.len(), 200);
}

#[test]
fn distant_particles_leave_the_histogram_empty() {
    let system = pair_system(
        SimBox::cube(10.0).unwrap(),
        Shape::sphere(1.0),
        Vector3::new(6.0, 0.0, 0.0),
    );
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(histogram.len(), 200);
    assert!(histogram.counts.iter().all(|&c| c == 0));
    assert_eq!(histogram.integral(), 0.0);
    let rho = 2.0 / 1000.0;
    let beta_p = histogram.beta_p().unwrap();
    assert!((beta_p - rho).abs() < 1e-12);
}

#[test]
fn sphere_pairs_use_the_closed_form() {
    let r = 1.0 / (1.0 - 0.00305);
    let system = pair_system(
        SimBox::cube(10.0).unwrap(),
        Shape::sphere(1.0),
        Vector3::new(0.0, r, 0.0),
    );
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(occupied_bins(&histogram), vec![(30, 2)]);
    assert!((histogram.density[30] - 1.0e4).abs() < 1e-6);
    assert!((histogram.integral() - 1.0).abs() < 1e-9);
}

#[test]
fn unwrapped_positions_still_find_their_neighbour() {
    let r = 1.0 / (1.0 - 0.00305);
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A"])
        .unwrap()
        .with_shape(0, Shape::sphere(1.0))
        .unwrap();
    system
        .add_particle(0, Vector3::zeros(), UnitQuaternion::identity())
        .unwrap();
    system
        .add_particle(0, Vector3::new(0.0, r + 20.0, 0.0), UnitQuaternion::identity())
        .unwrap();
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(occupied_bins(&histogram), vec![(30, 2)]);
}

#[test]
fn already_overlapping_pairs_fall_in_the_first_bin() {
    let system = pair_system(
        SimBox::cube(10.0).unwrap(),
        Shape::sphere(1.0),
        Vector3::new(0.9, 0.0, 0.0),
    );
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(occupied_bins(&histogram), vec![(0, 2)]);
}

#[test]
fn face_to_face_cubes_are_found_by_bisection() {
    let r = 1.0 / 0.99005;
    let system = pair_system(
        SimBox::cube(10.0).unwrap(),
        Shape::cube(1.0),
        Vector3::new(r, 0.3, -0.2),
    );
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(occupied_bins(&histogram), vec![(99, 2)]);
}

#[test]
fn planar_squares_are_supported() {
    let r = 1.0 / 0.99495;
    let square = Shape::polygon(&[[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]]);
    let system = pair_system(
        SimBox::square(10.0).unwrap(),
        square,
        Vector3::new(r, 0.25, 0.0),
    );
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert_eq!(occupied_bins(&histogram), vec![(50, 2)]);
}

#[test]
fn small_boxes_see_their_own_periodic_image() {
    let mut system = SystemState::new(SimBox::cube(1.005).unwrap(), ["A"])
        .unwrap()
        .with_shape(0, Shape::sphere(1.0))
        .unwrap();
    system
        .add_particle(0, Vector3::zeros(), UnitQuaternion::identity())
        .unwrap();
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    let expected_bin = ((1.0_f64 - 1.0 / 1.005) / 1e-4).floor() as usize;
    assert_eq!(expected_bin, 49);
    assert_eq!(occupied_bins(&histogram), vec![(49, 1)]);
}

#[test]
fn excluded_pairs_do_not_contribute() {
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A", "B"])
        .unwrap()
        .with_shape(0, Shape::sphere(1.0))
        .unwrap()
        .with_shape(1, Shape::sphere(1.0))
        .unwrap();
    system
        .add_particle(0, Vector3::zeros(), UnitQuaternion::identity())
        .unwrap();
    system
        .add_particle(1, Vector3::new(1.001, 0.0, 0.0), UnitQuaternion::identity())
        .unwrap();
    system.interaction_matrix_mut().set(0, 1, false).unwrap();
    let histogram = sdf().compute(&system, &ConvexOverlap::new()).unwrap();
    assert!(occupied_bins(&histogram).is_empty());
}

#[test]
fn constant_histogram_gives_the_contact_pressure() {
    let c = 3.0;
    let histogram =
        SdfHistogram::from_density(0.02, 1e-4, vec![c; 200], 100, 1000.0, Dimensions::Three);
    let beta_p = histogram.beta_p().unwrap();
    let expected = 0.1 * (1.0 + c / 6.0);
    assert!((beta_p - expected).abs() < 1e-9, "{beta_p} vs {expected}");
}

#[test]
fn linear_histogram_extrapolates_to_its_intercept() {
    let dx = 1e-4;
    let density: Vec<f64> = (0..200)
        .map(|k| 2.0 + 100.0 * (k as f64 * dx + dx / 2.0))
        .collect();
    let histogram = SdfHistogram::from_density(0.02, dx, density, 50, 100.0, Dimensions::Two);
    let beta_p = histogram.beta_p().unwrap();
    let expected = 0.5 * (1.0 + 2.0 / 4.0);
    assert!((beta_p - expected).abs() < 1e-8);
}

#[test]
fn undefined_histograms_yield_no_pressure() {
    let histogram = SdfHistogram::undefined(0.02, 1e-4, Dimensions::Three);
    assert!(!histogram.is_defined());
    assert_eq!(histogram.beta_p(), None);
    assert_eq!(histogram.integral(), 0.0);
}

#[test]
fn non_finite_entries_are_skipped_by_the_fit() {
    let mut density = vec![4.0; 200];
    density[3] = f64::NAN;
    density[150] = f64::INFINITY;
    let histogram =
        SdfHistogram::from_density(0.02, 1e-4, density, 10, 10.0, Dimensions::Three);
    let beta_p = histogram.beta_p().unwrap();
    assert!((beta_p - (1.0 + 4.0 / 6.0)).abs() < 1e-9);
}

#[test]
fn invalid_ranges_are_rejected() {
    let err = Sdf::new(SdfConfig {
        xmax: 0.01,
        dx: 0.02,
        threads: 0,
    })
    .unwrap_err();
    assert!(matches!(err, HpmcError::Configuration(_)));
    assert!(Sdf::new(SdfConfig {
        xmax: 1.0,
        dx: 0.1,
        threads: 0,
    })
    .is_err());
}

#[test]
fn missing_shapes_are_reported() {
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A"]).unwrap();
    system
        .add_particle(0, Vector3::zeros(), UnitQuaternion::identity())
        .unwrap();
    let err = sdf().compute(&system, &ConvexOverlap::new()).unwrap_err();
    assert_eq!(err.info().code, "missing-shape");
}

#[test]
fn sdf_configuration_parses_from_yaml() {
    let cfg = SdfConfig::from_yaml_str("xmax: 0.05\nthreads: 2\n").unwrap();
    assert_eq!(cfg.xmax, 0.05);
    assert_eq!(cfg.dx, 1e-4);
    assert_eq!(cfg.bin_count(), 500);
}
