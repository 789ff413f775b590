//! Shape-move strategies.
//!
//! A strategy turns the current shape of one particle type into a proposed
//! shape plus the log-space terms the updater needs for the Metropolis test.
//! Strategies keep only their own tunables and per-type auxiliary state
//! (parameter vectors, deformation gradients); the shape table itself is
//! owned by the configuration and is written only by the updater.

use hpmc_core::{ConfigurationProvider, Dimensions, ErrorInfo, HpmcError, RngHandle, Shape};
use nalgebra::{Matrix3, Vector3};

mod elastic;
mod shape_space;
mod vertex;

pub use elastic::{strain_energy, ElasticMove};
pub use shape_space::{ShapeCallback, ShapeSpaceMove};
pub use vertex::VertexMove;

/// Per-trial inputs handed to [`ShapeMove::propose`].
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    /// Type being moved.
    pub type_id: usize,
    /// Name of the type being moved.
    pub type_name: &'a str,
    /// Step size configured for the type.
    pub step_size: f64,
    /// Timestep of the invocation.
    pub timestep: u64,
    /// Number of particles of the type.
    pub population: usize,
    /// Dimensionality of the box.
    pub dimensions: Dimensions,
}

/// Strategy-specific state carried by a proposal and applied on acceptance.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalState {
    /// Nothing beyond the shape itself.
    Stateless,
    /// New shape-space parameter vector.
    Parameters(Vec<f64>),
    /// New deformation gradient relative to the reference shape.
    Deformation(Matrix3<f64>),
}

/// Proposed shape for one type together with its acceptance terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Candidate shape.
    pub shape: Shape,
    /// `ln q(old | new) - ln q(new | old)` including any Jacobian factor.
    pub ln_proposal_ratio: f64,
    /// Log Boltzmann factor of the proposal, `-beta dE`; zero for purely hard moves.
    pub ln_boltzmann: f64,
    /// State to commit into the strategy if the move is accepted.
    pub state: ProposalState,
}

impl Proposal {
    /// Log acceptance before the `min(0, .)` clamp.
    pub fn ln_acceptance(&self) -> f64 {
        self.ln_proposal_ratio + self.ln_boltzmann
    }
}

/// Proposes per-type shape changes for the shape updater.
pub trait ShapeMove: Send + Sync {
    /// Short label used in logs and errors.
    fn name(&self) -> &'static str;

    /// Probability that a selected type is actually moved on a sweep entry.
    fn move_probability(&self) -> f64;

    /// Validates the system and captures per-type reference data.
    ///
    /// Returns [`HpmcError::UnsupportedCombination`] when a type's shape kind
    /// cannot be handled by the strategy.
    fn attach(&mut self, system: &dyn ConfigurationProvider) -> Result<(), HpmcError>;

    /// Proposes a new shape for `context.type_id` starting from `current`.
    fn propose(
        &self,
        context: &MoveContext<'_>,
        current: &Shape,
        rng: &mut RngHandle,
    ) -> Result<Proposal, HpmcError>;

    /// Applies the state of an accepted proposal.
    fn commit(&mut self, type_id: usize, state: ProposalState);
}

pub(crate) fn check_probability(name: &str, probability: f64) -> Result<(), HpmcError> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(HpmcError::Configuration(
            ErrorInfo::new("invalid-probability", "probability must lie in [0, 1]")
                .with_context("parameter", name)
                .with_context("value", probability),
        ));
    }
    Ok(())
}

pub(crate) fn unsupported_kind(strategy: &str, type_id: usize, shape: &Shape) -> HpmcError {
    HpmcError::UnsupportedCombination(
        ErrorInfo::new("unsupported-move", "the move strategy cannot handle this shape kind")
            .with_context("strategy", strategy)
            .with_context("type_id", type_id)
            .with_context("kind", shape.kind().as_str()),
    )
}

/// Uniform draw from the ball (disk in 2D) of radius `radius`.
pub(crate) fn uniform_in_ball(dims: Dimensions, radius: f64, rng: &mut RngHandle) -> Vector3<f64> {
    loop {
        let x = rng.uniform_in(-1.0, 1.0);
        let y = rng.uniform_in(-1.0, 1.0);
        let z = match dims {
            Dimensions::Two => 0.0,
            Dimensions::Three => rng.uniform_in(-1.0, 1.0),
        };
        let candidate = Vector3::new(x, y, z);
        if candidate.norm_squared() <= 1.0 {
            return candidate * radius;
        }
    }
}

/// Uniform unit vector in 3D.
pub(crate) fn uniform_unit_vector(rng: &mut RngHandle) -> Vector3<f64> {
    loop {
        let candidate = uniform_in_ball(Dimensions::Three, 1.0, rng);
        let norm = candidate.norm();
        if norm > 1e-6 {
            return candidate / norm;
        }
    }
}
