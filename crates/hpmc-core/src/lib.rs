#![deny(missing_docs)]
#![doc = "Shapes, periodic boxes, the overlap oracle and configuration traits shared by the HPMC analysis and shape-move crates."]

use nalgebra::{UnitQuaternion, Vector3};

pub mod errors;
pub mod geometry;
pub mod hull;
pub mod overlap;
pub mod rng;
pub mod serialization;
pub mod shape;
mod system;

pub use errors::{ErrorInfo, HpmcError};
pub use geometry::{random_orientation, Dimensions, Pose, SimBox};
pub use overlap::{ConvexOverlap, OverlapOracle};
pub use rng::{derive_seed_path, derive_substream_seed, RngHandle};
pub use shape::{Shape, ShapeKind};
pub use system::{InteractionMatrix, SystemState};

/// Read access to a particle configuration.
///
/// Indices passed to the per-particle accessors must be below
/// [`ConfigurationProvider::particle_count`]; per-type accessors accept any
/// id and report unknown types as `None`.
pub trait ConfigurationProvider: Send + Sync {
    /// Periodic simulation box.
    fn sim_box(&self) -> &SimBox;

    /// Number of particles.
    fn particle_count(&self) -> usize;

    /// Number of particle types.
    fn type_count(&self) -> usize;

    /// Position of particle `index`.
    fn position(&self, index: usize) -> Vector3<f64>;

    /// Orientation of particle `index`.
    fn orientation(&self, index: usize) -> UnitQuaternion<f64>;

    /// Type id of particle `index`.
    fn type_of(&self, index: usize) -> usize;

    /// Name of `type_id`, if the type exists.
    fn type_name(&self, type_id: usize) -> Option<&str>;

    /// Shape assigned to `type_id`, if any.
    fn shape(&self, type_id: usize) -> Option<&Shape>;

    /// Whether particles of types `a` and `b` are tested for overlap.
    fn interacts(&self, a: usize, b: usize) -> bool;

    /// Dimensionality of the box.
    fn dimensions(&self) -> Dimensions {
        self.sim_box().dimensions
    }

    /// Pose of particle `index`.
    fn pose(&self, index: usize) -> Pose {
        Pose::new(self.position(index), self.orientation(index))
    }

    /// Number of particles of each type.
    fn populations(&self) -> Vec<usize> {
        let mut counts = vec![0; self.type_count()];
        for index in 0..self.particle_count() {
            if let Some(slot) = counts.get_mut(self.type_of(index)) {
                *slot += 1;
            }
        }
        counts
    }

    /// Shape of `type_id`, or a configuration error when none is defined.
    fn require_shape(&self, type_id: usize) -> Result<&Shape, HpmcError> {
        self.shape(type_id)
            .ok_or_else(|| HpmcError::missing_shape(type_id))
    }
}

/// Write path for per-type shapes, used only by the shape updater.
pub trait ShapeCommit {
    /// Validates and stores `shape` as the new shape of `type_id`.
    fn commit_shape(&mut self, type_id: usize, shape: Shape) -> Result<(), HpmcError>;
}
