#![deny(missing_docs)]
#![doc = "Shape-move strategies and the Metropolis shape updater for hard-particle Monte Carlo."]

/// YAML configuration schema for the updater and its strategies.
pub mod config;
/// Deterministic seed derivation for sweeps and moves.
pub mod determinism;
/// Move counters and the per-invocation CSV log.
pub mod metrics;
pub mod moves;
/// Timestep triggers.
pub mod trigger;
pub mod updater;
pub mod variant;

pub use config::{MoveConfig, RunConfig, UpdaterConfig};
pub use metrics::{MoveStatistics, ShapeMoveLog, ShapeMoveSample};
pub use moves::{
    strain_energy, ElasticMove, MoveContext, Proposal, ProposalState, ShapeCallback, ShapeMove,
    ShapeSpaceMove, VertexMove,
};
pub use trigger::Trigger;
pub use updater::{ShapeUpdater, UpdaterState};
pub use variant::Variant;
