use std::fs;

use hpmc_core::{ConfigurationProvider, ConvexOverlap, HpmcError, Shape, SimBox, SystemState};
use nalgebra::{UnitQuaternion, Vector3};
use tempfile::tempdir;

use hpmc_update::{
    MoveConfig, RunConfig, ShapeMove, ShapeUpdater, Trigger, UpdaterConfig, UpdaterState,
    Variant, VertexMove,
};

fn cubes(types: &[&str]) -> SystemState {
    let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), types.iter().copied()).unwrap();
    for (type_id, _) in types.iter().enumerate() {
        system.set_shape(type_id, Shape::cube(1.0)).unwrap();
        system
            .add_particle(
                type_id,
                Vector3::new(3.0 * type_id as f64 - 3.0, 0.0, 0.0),
                UnitQuaternion::identity(),
            )
            .unwrap();
    }
    system
}

/// Vertex move that always grows type A to volume 2; accepted whenever nothing blocks it.
fn growing_updater(config: UpdaterConfig) -> ShapeUpdater {
    let strategy = VertexMove::new(1.0).unwrap().with_volume("A", 2.0).unwrap();
    ShapeUpdater::new(config, Box::new(strategy)).unwrap()
}

fn small_steps() -> UpdaterConfig {
    UpdaterConfig {
        default_step_size: 0.01,
        ..UpdaterConfig::default()
    }
}

#[test]
fn update_before_attach_is_a_configuration_error() {
    let mut system = cubes(&["A"]);
    let mut updater = growing_updater(small_steps());
    assert_eq!(updater.state(), UpdaterState::Idle);
    let err = updater
        .update(0, &mut system, &ConvexOverlap::default())
        .unwrap_err();
    assert!(matches!(err, HpmcError::Configuration(_)));
    assert_eq!(err.info().code, "not-attached");
}

#[test]
fn attach_and_detach_drive_the_state_machine() {
    let mut system = cubes(&["A"]);
    let oracle = ConvexOverlap::default();
    let mut updater = growing_updater(small_steps());
    updater.attach(&system, &oracle).unwrap();
    assert_eq!(updater.state(), UpdaterState::Attached);
    updater.update(0, &mut system, &oracle).unwrap();
    assert_eq!(updater.state(), UpdaterState::Attached);

    updater.detach();
    assert_eq!(updater.state(), UpdaterState::Idle);
    assert!(updater.update(1, &mut system, &oracle).is_err());
}

#[test]
fn attach_requires_a_shape_for_every_type() {
    let system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A"]).unwrap();
    let mut updater = growing_updater(small_steps());
    let err = updater
        .attach(&system, &ConvexOverlap::default())
        .unwrap_err();
    assert_eq!(err.info().code, "missing-shape");
    assert_eq!(updater.state(), UpdaterState::Idle);
}

#[test]
fn inactive_steps_do_nothing() {
    let mut system = cubes(&["A"]);
    let oracle = ConvexOverlap::default();
    let config = UpdaterConfig {
        trigger: Trigger::Periodic {
            period: 10,
            phase: 0,
        },
        ..small_steps()
    };
    let mut updater = growing_updater(config);
    updater.attach(&system, &oracle).unwrap();

    assert!(!updater.update(3, &mut system, &oracle).unwrap());
    assert_eq!(updater.shape_moves(), [0, 0]);
    assert!(updater.log().samples().is_empty());
    assert_eq!(system.shape(0).unwrap(), &Shape::cube(1.0));

    assert!(updater.update(10, &mut system, &oracle).unwrap());
    assert_eq!(updater.shape_moves(), [1, 0]);
}

#[test]
fn pretend_mode_counts_without_committing() {
    let mut system = cubes(&["A"]);
    let oracle = ConvexOverlap::default();
    let config = UpdaterConfig {
        pretend: true,
        ..small_steps()
    };
    let mut updater = growing_updater(config);
    updater.attach(&system, &oracle).unwrap();

    for step in 0..5 {
        updater.update(step, &mut system, &oracle).unwrap();
    }
    assert_eq!(updater.shape_moves(), [5, 0]);
    assert_eq!(system.shape(0).unwrap(), &Shape::cube(1.0));
    assert!((updater.total_particle_volume() - 1.0).abs() < 1e-12);
}

#[test]
fn excluded_pairs_do_not_block_moves() {
    let oracle = ConvexOverlap::default();
    let build = |interacting: bool| {
        let mut system = SystemState::new(SimBox::cube(10.0).unwrap(), ["A", "B"]).unwrap();
        system.set_shape(0, Shape::cube(1.0)).unwrap();
        system.set_shape(1, Shape::cube(1.0)).unwrap();
        system
            .add_particle(0, Vector3::zeros(), UnitQuaternion::identity())
            .unwrap();
        system
            .add_particle(1, Vector3::new(0.2, 0.0, 0.0), UnitQuaternion::identity())
            .unwrap();
        system
            .interaction_matrix_mut()
            .set(0, 1, interacting)
            .unwrap();
        system
    };
    let config = UpdaterConfig {
        nsweeps: 1,
        type_select: 2,
        ..small_steps()
    };

    let mut excluded = build(false);
    let mut updater = growing_updater(config.clone());
    updater.attach(&excluded, &oracle).unwrap();
    updater.update(0, &mut excluded, &oracle).unwrap();
    let [accepted, _] = updater.shape_moves();
    assert!(accepted >= 1);
    assert_ne!(excluded.shape(0).unwrap(), &Shape::cube(1.0));

    let mut blocked = build(true);
    let mut updater = growing_updater(config);
    updater.attach(&blocked, &oracle).unwrap();
    updater.update(0, &mut blocked, &oracle).unwrap();
    assert_eq!(updater.shape_moves(), [0, 2]);
    assert_eq!(blocked.shape(0).unwrap(), &Shape::cube(1.0));
}

#[test]
fn type_select_limits_the_moves_per_sweep() {
    let mut system = cubes(&["A", "B", "C"]);
    let oracle = ConvexOverlap::default();
    let config = UpdaterConfig {
        nsweeps: 3,
        type_select: 2,
        ..small_steps()
    };
    let strategy = VertexMove::new(0.0).unwrap();
    let mut updater = ShapeUpdater::new(config, Box::new(strategy)).unwrap();
    updater.attach(&system, &oracle).unwrap();
    updater.update(0, &mut system, &oracle).unwrap();
    assert_eq!(updater.shape_moves(), [6, 0]);
}

#[test]
fn same_seed_gives_identical_trajectories() {
    let oracle = ConvexOverlap::default();
    let run = |seed: u64| {
        let mut system = cubes(&["A", "B"]);
        let config = UpdaterConfig {
            seed,
            nsweeps: 2,
            default_step_size: 0.1,
            ..UpdaterConfig::default()
        };
        let mut updater =
            ShapeUpdater::new(config, Box::new(VertexMove::new(0.7).unwrap())).unwrap();
        updater.attach(&system, &oracle).unwrap();
        for step in 0..15 {
            updater.update(step, &mut system, &oracle).unwrap();
        }
        (
            updater.shape_moves(),
            system.shape(0).unwrap().clone(),
            system.shape(1).unwrap().clone(),
        )
    };
    assert_eq!(run(42), run(42));
    assert_ne!(run(42), run(43));
}

#[test]
fn statistics_reset_and_reattach() {
    let mut system = cubes(&["A"]);
    let oracle = ConvexOverlap::default();
    let mut updater = growing_updater(small_steps());
    updater.attach(&system, &oracle).unwrap();
    updater.update(0, &mut system, &oracle).unwrap();
    assert_eq!(updater.statistics().total(), 1);
    assert_eq!(updater.statistics().acceptance_rate(), Some(1.0));

    updater.reset_statistics();
    assert_eq!(updater.shape_moves(), [0, 0]);
    assert_eq!(updater.statistics().acceptance_rate(), None);

    updater.update(1, &mut system, &oracle).unwrap();
    updater.attach(&system, &oracle).unwrap();
    assert_eq!(updater.shape_moves(), [0, 0]);
    assert!((updater.total_particle_volume() - 2.0).abs() < 1e-9);
}

#[test]
fn move_log_is_written_as_csv() {
    let mut system = cubes(&["A"]);
    let oracle = ConvexOverlap::default();
    let mut updater = growing_updater(small_steps());
    updater.attach(&system, &oracle).unwrap();
    for step in 0..3 {
        updater.update(step, &mut system, &oracle).unwrap();
    }
    assert_eq!(updater.log().samples().len(), 3);
    assert_eq!(updater.log().samples()[2].timestep, 2);

    let dir = tempdir().unwrap();
    let path = dir.path().join("shape_moves.csv");
    updater.log().write_csv(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "timestep,accepted,rejected,total_volume");
    assert!(lines[1].starts_with("0,1,0,2.0"));
}

#[test]
fn invalid_updater_configs_are_rejected() {
    let strategy = || Box::new(VertexMove::new(1.0).unwrap());
    let err = ShapeUpdater::new(
        UpdaterConfig {
            nsweeps: 0,
            ..UpdaterConfig::default()
        },
        strategy(),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "invalid-sweeps");

    let mut config = UpdaterConfig::default();
    config.step_size.insert("A".into(), -0.1);
    let err = ShapeUpdater::new(config, strategy()).unwrap_err();
    assert_eq!(err.info().code, "invalid-step-size");

    let config = UpdaterConfig {
        trigger: Trigger::Periodic {
            period: 0,
            phase: 0,
        },
        ..UpdaterConfig::default()
    };
    let err = ShapeUpdater::new(config, strategy()).unwrap_err();
    assert_eq!(err.info().code, "invalid-trigger");
}

#[test]
fn run_config_loads_from_yaml() {
    let yaml = r#"
updater:
  trigger:
    kind: periodic
    period: 5
  nsweeps: 3
  default_step_size: 0.05
  step_size:
    B: 0.01
  seed: 99
strategy:
  strategy: vertex
  move_probability: 0.5
  volume:
    A: 2.0
"#;
    let config = RunConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(
        config.updater.trigger,
        Trigger::Periodic {
            period: 5,
            phase: 0
        }
    );
    assert_eq!(config.updater.nsweeps, 3);
    assert_eq!(config.updater.type_select, 1);
    assert!(!config.updater.pretend);
    assert_eq!(config.updater.step_size_for("A"), 0.05);
    assert_eq!(config.updater.step_size_for("B"), 0.01);
    assert!(matches!(
        config.strategy,
        MoveConfig::Vertex {
            move_probability,
            ..
        } if move_probability == 0.5
    ));

    let updater = config.build_updater().unwrap();
    assert_eq!(updater.strategy().name(), "vertex");
    assert_eq!(updater.strategy().move_probability(), 0.5);
    assert_eq!(updater.config().seed, 99);
}

#[test]
fn elastic_strategy_loads_from_yaml() {
    let yaml = r#"
strategy:
  strategy: elastic
  stiffness:
    kind: ramp
    a: 1.0
    b: 10.0
    t_start: 0
    t_ramp: 100
  stretch_fraction: 0.25
  reference_shape:
    A:
      kind: ellipsoid
      a: 1.0
      b: 0.5
      c: 0.5
"#;
    let config = RunConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.updater, UpdaterConfig::default());
    assert_eq!(
        config.strategy,
        MoveConfig::Elastic {
            move_probability: 1.0,
            stiffness: Variant::Ramp {
                a: 1.0,
                b: 10.0,
                t_start: 0,
                t_ramp: 100,
            },
            stretch_fraction: 0.25,
            reference_shape: [(
                "A".to_string(),
                Shape::Ellipsoid {
                    a: 1.0,
                    b: 0.5,
                    c: 0.5,
                },
            )]
            .into_iter()
            .collect(),
        }
    );
    let updater = config.build_updater().unwrap();
    assert_eq!(updater.strategy().name(), "elastic");

    let err = RunConfig::from_yaml_str("strategy:\n  strategy: spin\n").unwrap_err();
    assert!(matches!(err, HpmcError::Serde(_)));
}
