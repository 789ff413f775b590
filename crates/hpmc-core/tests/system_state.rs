use hpmc_core::{
    ConfigurationProvider, Dimensions, HpmcError, Shape, ShapeCommit, SimBox, SystemState,
};
use nalgebra::{UnitQuaternion, Vector3};

fn two_type_system() -> SystemState {
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A", "B"]).unwrap();
    for (type_id, x) in [(0, -2.0), (0, 0.0), (1, 2.0)] {
        system
            .add_particle(type_id, Vector3::new(x, 0.0, 0.0), UnitQuaternion::identity())
            .unwrap();
    }
    system
}

#[test]
fn populations_count_particles_per_type() {
    let system = two_type_system();
    assert_eq!(system.particle_count(), 3);
    assert_eq!(system.populations(), vec![2, 1]);
    assert_eq!(system.type_id("B"), Some(1));
    assert_eq!(system.type_name(0), Some("A"));
    assert_eq!(system.dimensions(), Dimensions::Three);
}

#[test]
fn missing_shapes_are_configuration_errors() {
    let system = two_type_system();
    let err = system.require_shape(1).unwrap_err();
    assert!(matches!(err, HpmcError::Configuration(_)));
    assert_eq!(err.info().code, "missing-shape");
}

#[test]
fn committed_shapes_read_back_exactly() {
    let mut system = two_type_system();
    let shape = Shape::polyhedron(&[
        [0.1234567890123, 0.0, 0.0],
        [0.0, 0.3, 0.0],
        [0.0, 0.0, 0.7],
        [-0.2, -0.2, -0.2],
    ]);
    system.commit_shape(0, shape.clone()).unwrap();
    assert_eq!(system.require_shape(0).unwrap(), &shape);
}

#[test]
fn commits_are_validated() {
    let mut system = two_type_system();
    let err = system
        .commit_shape(0, Shape::polygon(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]))
        .unwrap_err();
    assert_eq!(err.info().code, "dimension-mismatch");
    assert!(system.shape(0).is_none());

    let err = system.commit_shape(5, Shape::sphere(1.0)).unwrap_err();
    assert_eq!(err.info().code, "unknown-type");
}

#[test]
fn interaction_matrix_is_symmetric_and_survives_new_types() {
    let mut system = two_type_system();
    assert!(system.interacts(0, 1));
    system.interaction_matrix_mut().set(0, 1, false).unwrap();
    assert!(!system.interacts(1, 0));

    let probe = system.add_type("probe");
    assert_eq!(probe, 2);
    assert!(!system.interacts(0, 1));
    assert!(system.interacts(2, 0));
    assert!(system.interaction_matrix_mut().set(0, 7, false).is_err());
}

#[test]
fn particles_of_unknown_types_are_rejected() {
    let mut system = two_type_system();
    let err = system
        .add_particle(9, Vector3::zeros(), UnitQuaternion::identity())
        .unwrap_err();
    assert!(matches!(err, HpmcError::Configuration(_)));
}

#[test]
fn positions_are_wrapped_into_the_primary_box() {
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A"]).unwrap();
    let index = system
        .add_particle(0, Vector3::new(12.0, -7.0, 4.0), UnitQuaternion::identity())
        .unwrap();
    let wrapped = system.position(index);
    assert!((wrapped - Vector3::new(2.0, 3.0, 4.0)).norm() < 1e-12);

    let err = system
        .add_particle(0, Vector3::new(f64::NAN, 0.0, 0.0), UnitQuaternion::identity())
        .unwrap_err();
    assert_eq!(err.info().code, "invalid-position");
    assert_eq!(system.particle_count(), 1);
}
