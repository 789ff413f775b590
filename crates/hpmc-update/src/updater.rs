//! Metropolis driver for per-type shape moves.
//!
//! One invocation runs `nsweeps` sweeps. Each sweep picks `type_select`
//! distinct types and gives each of them one chance to change shape: the
//! move-probability gate, the strategy proposal, a hard-overlap check of every
//! particle of the type against its neighbours and periodic images, and
//! finally the Metropolis test on the proposal ratio and Boltzmann factor.
//! Everything runs on the calling thread; commits happen in order.

use std::fmt;

use hpmc_core::{
    ConfigurationProvider, ErrorInfo, HpmcError, OverlapOracle, Pose, RngHandle, Shape,
    ShapeCommit,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::config::UpdaterConfig;
use crate::determinism;
use crate::metrics::{MoveStatistics, ShapeMoveLog, ShapeMoveSample};
use crate::moves::{MoveContext, ShapeMove};

/// Lifecycle of a [`ShapeUpdater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdaterState {
    /// No configuration has been validated yet.
    Idle,
    /// Attached and waiting for the next invocation.
    Attached,
    /// Inside an invocation.
    Running,
}

/// Shape-mutation Monte Carlo updater.
///
/// The updater holds no reference to the configuration; callers pass it to
/// [`ShapeUpdater::attach`] and to every [`ShapeUpdater::update`].
pub struct ShapeUpdater {
    config: UpdaterConfig,
    strategy: Box<dyn ShapeMove>,
    state: UpdaterState,
    statistics: MoveStatistics,
    total_volume: f64,
    log: ShapeMoveLog,
}

impl fmt::Debug for ShapeUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeUpdater")
            .field("config", &self.config)
            .field("strategy", &self.strategy.name())
            .field("state", &self.state)
            .field("statistics", &self.statistics)
            .field("total_volume", &self.total_volume)
            .finish()
    }
}

impl ShapeUpdater {
    /// Creates an idle updater driving `strategy`.
    pub fn new(config: UpdaterConfig, strategy: Box<dyn ShapeMove>) -> Result<Self, HpmcError> {
        config.validate()?;
        Ok(Self {
            config,
            strategy,
            state: UpdaterState::Idle,
            statistics: MoveStatistics::default(),
            total_volume: 0.0,
            log: ShapeMoveLog::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> UpdaterState {
        self.state
    }

    /// The move strategy.
    pub fn strategy(&self) -> &dyn ShapeMove {
        self.strategy.as_ref()
    }

    /// Mutable access to the move strategy.
    pub fn strategy_mut(&mut self) -> &mut dyn ShapeMove {
        self.strategy.as_mut()
    }

    /// Validates `system` against the oracle and the strategy and resets the counters.
    ///
    /// Every type needs a shape that fits the box, the oracle must handle
    /// every interacting pair of shape kinds, and the strategy must accept
    /// every type.
    #[instrument(skip_all, fields(strategy = self.strategy.name()))]
    pub fn attach<P, O>(&mut self, system: &P, oracle: &O) -> Result<(), HpmcError>
    where
        P: ConfigurationProvider,
        O: OverlapOracle + ?Sized,
    {
        let dims = system.dimensions();
        let n_types = system.type_count();
        for type_id in 0..n_types {
            system.require_shape(type_id)?.validate(dims)?;
        }
        for a in 0..n_types {
            for b in a..n_types {
                if !system.interacts(a, b) {
                    continue;
                }
                let kind_a = system.require_shape(a)?.kind();
                let kind_b = system.require_shape(b)?.kind();
                if !oracle.supports(kind_a, kind_b, dims) {
                    return Err(HpmcError::UnsupportedCombination(
                        ErrorInfo::new("no-overlap-test", "oracle cannot test the pair")
                            .with_context("a", kind_a.as_str())
                            .with_context("b", kind_b.as_str()),
                    ));
                }
            }
        }
        self.strategy.attach(system)?;

        self.statistics.reset();
        self.log.clear();
        self.total_volume = total_volume(system)?;
        self.state = UpdaterState::Attached;
        info!(types = n_types, total_volume = self.total_volume, "shape updater attached");
        Ok(())
    }

    /// Returns to the idle state.
    pub fn detach(&mut self) {
        self.state = UpdaterState::Idle;
    }

    /// Runs one invocation at `timestep` if the trigger fires.
    ///
    /// Returns `Ok(false)` without touching anything on inactive steps.
    #[instrument(skip_all, fields(timestep = timestep, strategy = self.strategy.name()))]
    pub fn update<S, O>(
        &mut self,
        timestep: u64,
        system: &mut S,
        oracle: &O,
    ) -> Result<bool, HpmcError>
    where
        S: ConfigurationProvider + ShapeCommit,
        O: OverlapOracle + ?Sized,
    {
        if self.state == UpdaterState::Idle {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("not-attached", "the shape updater is not attached")
                    .with_hint("call attach before update"),
            ));
        }
        if !self.config.trigger.is_active(timestep) {
            return Ok(false);
        }

        self.state = UpdaterState::Running;
        let outcome = self.run_sweeps(timestep, system, oracle);
        self.state = UpdaterState::Attached;
        outcome?;

        self.total_volume = total_volume(&*system)?;
        self.log.push_sample(ShapeMoveSample {
            timestep,
            accepted: self.statistics.accepted,
            rejected: self.statistics.rejected,
            total_volume: self.total_volume,
        });
        info!(
            accepted = self.statistics.accepted,
            rejected = self.statistics.rejected,
            total_volume = self.total_volume,
            "shape moves finished"
        );
        Ok(true)
    }

    fn run_sweeps<S, O>(
        &mut self,
        timestep: u64,
        system: &mut S,
        oracle: &O,
    ) -> Result<(), HpmcError>
    where
        S: ConfigurationProvider + ShapeCommit,
        O: OverlapOracle + ?Sized,
    {
        let seed = self.config.seed;
        let dimensions = system.dimensions();
        let populations = system.populations();
        let n_types = system.type_count();

        for sweep in 0..self.config.nsweeps {
            let mut select_rng =
                RngHandle::from_seed(determinism::selection_seed(seed, timestep, sweep));
            let selected: Vec<usize> = if self.config.type_select >= n_types {
                (0..n_types).collect()
            } else {
                rand::seq::index::sample(select_rng.inner_mut(), n_types, self.config.type_select)
                    .into_vec()
            };
            debug!(sweep, types = ?selected, "sweep");

            for (slot, &type_id) in selected.iter().enumerate() {
                let mut rng =
                    RngHandle::from_seed(determinism::move_seed(seed, timestep, sweep, slot));
                if rng.uniform() >= self.strategy.move_probability() {
                    self.statistics.record(true);
                    continue;
                }

                let type_name = system.type_name(type_id).unwrap_or_default().to_owned();
                let context = MoveContext {
                    type_id,
                    type_name: &type_name,
                    step_size: self.config.step_size_for(&type_name),
                    timestep,
                    population: populations.get(type_id).copied().unwrap_or(0),
                    dimensions,
                };
                let current = system.require_shape(type_id)?.clone();
                let proposal = match self.strategy.propose(&context, &current, &mut rng) {
                    Ok(proposal) => proposal,
                    Err(err) if err.is_degenerate_geometry() => {
                        trace!(type_id, error = %err, "degenerate proposal rejected");
                        self.statistics.record(false);
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                if proposal.shape.validate(dimensions).is_err() {
                    self.statistics.record(false);
                    continue;
                }

                if type_overlaps(&*system, oracle, type_id, &proposal.shape)? {
                    self.statistics.record(false);
                    continue;
                }
                let ln_acceptance = proposal.ln_acceptance().min(0.0);
                let accepted = rng.uniform() <= ln_acceptance.exp();
                self.statistics.record(accepted);
                if accepted && !self.config.pretend {
                    system.commit_shape(type_id, proposal.shape)?;
                    self.strategy.commit(type_id, proposal.state);
                }
            }
        }
        Ok(())
    }

    /// Counters as `[accepted, rejected]` since attach or the last reset.
    pub fn shape_moves(&self) -> [u64; 2] {
        self.statistics.as_array()
    }

    /// Move counters since attach or the last reset.
    pub fn statistics(&self) -> &MoveStatistics {
        &self.statistics
    }

    /// Zeroes the move counters.
    pub fn reset_statistics(&mut self) {
        self.statistics.reset();
    }

    /// Sum of particle volumes after the last attach or invocation.
    pub fn total_particle_volume(&self) -> f64 {
        self.total_volume
    }

    /// Per-invocation samples.
    pub fn log(&self) -> &ShapeMoveLog {
        &self.log
    }
}

fn total_volume<P: ConfigurationProvider + ?Sized>(system: &P) -> Result<f64, HpmcError> {
    let dims = system.dimensions();
    let mut total = 0.0;
    for (type_id, &count) in system.populations().iter().enumerate() {
        if count > 0 {
            total += system.require_shape(type_id)?.volume(dims)? * count as f64;
        }
    }
    Ok(total)
}

/// Whether giving every particle of `type_id` the shape `proposed` creates an overlap.
fn type_overlaps<P, O>(
    system: &P,
    oracle: &O,
    type_id: usize,
    proposed: &Shape,
) -> Result<bool, HpmcError>
where
    P: ConfigurationProvider + ?Sized,
    O: OverlapOracle + ?Sized,
{
    let sim_box = system.sim_box();
    let dims = sim_box.dimensions;
    let n_types = system.type_count();

    let mut shapes = Vec::with_capacity(n_types);
    for t in 0..n_types {
        shapes.push(if t == type_id {
            proposed
        } else {
            system.require_shape(t)?
        });
    }
    let reach_i = proposed.circumsphere_radius();
    let max_reach = shapes
        .iter()
        .map(|s| s.circumsphere_radius())
        .fold(0.0, f64::max);
    let offsets = sim_box.image_offsets(reach_i + max_reach);

    for i in 0..system.particle_count() {
        if system.type_of(i) != type_id {
            continue;
        }
        let pose_i = Pose::new(Vector3::zeros(), system.orientation(i));
        let pos_i = system.position(i);
        for j in 0..system.particle_count() {
            let type_j = system.type_of(j);
            if !system.interacts(type_id, type_j) {
                continue;
            }
            let shape_j = shapes[type_j];
            let reach = reach_i + shape_j.circumsphere_radius();
            let base = sim_box.minimum_image(&(system.position(j) - pos_i));
            for (image, offset) in offsets.iter().enumerate() {
                if i == j && image == 0 {
                    continue;
                }
                let separation = base + offset;
                if separation.norm() >= reach {
                    continue;
                }
                let pose_j = Pose::new(separation, system.orientation(j));
                if oracle.overlaps(proposed, &pose_i, shape_j, &pose_j, dims)? {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}
