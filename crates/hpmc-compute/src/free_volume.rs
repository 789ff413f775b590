//! Monte Carlo estimate of the volume available to a probe particle.

use hpmc_core::{
    random_orientation, ConfigurationProvider, ErrorInfo, HpmcError, OverlapOracle, Pose,
    RngHandle, Shape,
};
use nalgebra::{UnitQuaternion, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::FreeVolumeConfig;
use crate::determinism::sample_seed;
use crate::dispatch;

/// Result of a free-volume estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeVolumeEstimate {
    /// Estimated volume (area in 2D) accessible to the probe.
    pub free_volume: f64,
    /// Number of trial insertions.
    pub num_samples: usize,
    /// Trials that overlapped at least one particle.
    pub num_overlaps: usize,
    /// Volume of the box the trials were drawn from.
    pub box_volume: f64,
}

impl FreeVolumeEstimate {
    /// Fraction of the box accessible to the probe.
    pub fn free_fraction(&self) -> f64 {
        self.free_volume / self.box_volume
    }
}

/// Particle the probe is tested against.
struct Obstacle<'a> {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    shape: &'a Shape,
    radius: f64,
}

/// Free-volume estimator.
///
/// Each trial places the probe shape uniformly in the box with a uniform
/// orientation and checks it against every particle whose type interacts
/// with the probe type, using minimum-image separations.
#[derive(Debug, Clone)]
pub struct FreeVolume {
    config: FreeVolumeConfig,
}

impl FreeVolume {
    /// Creates an estimator after validating its configuration.
    pub fn new(config: FreeVolumeConfig) -> Result<Self, HpmcError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &FreeVolumeConfig {
        &self.config
    }

    /// Estimates the free volume of the current configuration.
    ///
    /// Trial `k` draws from the substream `(seed, timestep, k)`, so the result
    /// does not depend on the number of worker threads.
    #[instrument(skip_all, fields(timestep = timestep, samples = self.config.num_samples))]
    pub fn compute<P, O>(
        &self,
        system: &P,
        oracle: &O,
        timestep: u64,
    ) -> Result<FreeVolumeEstimate, HpmcError>
    where
        P: ConfigurationProvider + ?Sized,
        O: OverlapOracle + ?Sized,
    {
        let test_type = self.config.test_particle_type;
        if test_type >= system.type_count() {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("unknown-type", "test particle type is out of range")
                    .with_context("type_id", test_type)
                    .with_context("n_types", system.type_count()),
            ));
        }
        let sim_box = *system.sim_box();
        let dims = sim_box.dimensions;
        let probe = system.require_shape(test_type)?;
        probe.validate(dims)?;
        let probe_radius = probe.circumsphere_radius();

        let mut obstacles = Vec::new();
        for index in 0..system.particle_count() {
            let type_id = system.type_of(index);
            if !system.interacts(test_type, type_id) {
                continue;
            }
            let shape = system.require_shape(type_id)?;
            if !oracle.supports(probe.kind(), shape.kind(), dims) {
                return Err(HpmcError::UnsupportedCombination(
                    ErrorInfo::new("no-overlap-test", "oracle cannot test the probe pair")
                        .with_context("probe", probe.kind().as_str())
                        .with_context("other", shape.kind().as_str()),
                ));
            }
            obstacles.push(Obstacle {
                position: system.position(index),
                orientation: system.orientation(index),
                shape,
                radius: shape.circumsphere_radius(),
            });
        }
        debug!(obstacles = obstacles.len(), "collected interacting particles");

        let seed = self.config.seed;
        let trial = |sample: usize| -> Result<usize, HpmcError> {
            let mut rng = RngHandle::from_seed(sample_seed(seed, timestep, sample));
            let position = sim_box.random_position(&mut rng);
            let probe_pose = Pose::new(Vector3::zeros(), random_orientation(dims, &mut rng));
            for obstacle in &obstacles {
                let delta = sim_box.minimum_image(&(obstacle.position - position));
                if delta.norm() >= probe_radius + obstacle.radius {
                    continue;
                }
                let other = Pose::new(delta, obstacle.orientation);
                if oracle.overlaps(probe, &probe_pose, obstacle.shape, &other, dims)? {
                    return Ok(1);
                }
            }
            Ok(0)
        };

        let num_samples = self.config.num_samples;
        let num_overlaps = dispatch::install(self.config.threads, || {
            (0..num_samples)
                .into_par_iter()
                .map(trial)
                .try_reduce(|| 0, |a, b| Ok(a + b))
        })??;

        let box_volume = sim_box.volume();
        let free_volume =
            box_volume * (num_samples - num_overlaps) as f64 / num_samples as f64;
        info!(free_volume, num_overlaps, "free volume estimated");
        Ok(FreeVolumeEstimate {
            free_volume,
            num_samples,
            num_overlaps,
            box_volume,
        })
    }
}
