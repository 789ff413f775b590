use criterion::{criterion_group, criterion_main, Criterion};
use hpmc_core::{ConvexOverlap, Shape, SimBox, SystemState};
use nalgebra::{UnitQuaternion, Vector3};

use hpmc_update::{ElasticMove, ShapeUpdater, UpdaterConfig, Variant, VertexMove};

fn cube_lattice(per_side: usize, spacing: f64) -> SystemState {
    let length = per_side as f64 * spacing;
    let mut system = SystemState::new(SimBox::cube(length).unwrap(), ["cube"])
        .unwrap()
        .with_shape(0, Shape::cube(1.0))
        .unwrap();
    for i in 0..per_side {
        for j in 0..per_side {
            for k in 0..per_side {
                let position = Vector3::new(i as f64, j as f64, k as f64) * spacing
                    - Vector3::repeat(length / 2.0);
                system
                    .add_particle(0, position, UnitQuaternion::identity())
                    .unwrap();
            }
        }
    }
    system
}

fn bench_config() -> UpdaterConfig {
    UpdaterConfig {
        nsweeps: 4,
        default_step_size: 0.02,
        seed: 42,
        ..UpdaterConfig::default()
    }
}

fn bench_vertex_sweep(c: &mut Criterion) {
    let oracle = ConvexOverlap::new();
    let template = cube_lattice(4, 1.3);

    c.bench_function("vertex_sweep", |b| {
        b.iter(|| {
            let mut system = template.clone();
            let strategy = VertexMove::new(1.0).unwrap();
            let mut updater = ShapeUpdater::new(bench_config(), Box::new(strategy)).unwrap();
            updater.attach(&system, &oracle).unwrap();
            for step in 0..5 {
                updater.update(step, &mut system, &oracle).unwrap();
            }
        })
    });
}

fn bench_elastic_sweep(c: &mut Criterion) {
    let oracle = ConvexOverlap::new();
    let template = cube_lattice(4, 1.3);

    c.bench_function("elastic_sweep", |b| {
        b.iter(|| {
            let mut system = template.clone();
            let strategy = ElasticMove::new(Variant::constant(10.0), 1.0).unwrap();
            let mut updater = ShapeUpdater::new(bench_config(), Box::new(strategy)).unwrap();
            updater.attach(&system, &oracle).unwrap();
            for step in 0..5 {
                updater.update(step, &mut system, &oracle).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_vertex_sweep, bench_elastic_sweep);
criterion_main!(benches);
