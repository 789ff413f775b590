use std::collections::BTreeMap;

use hpmc_core::serialization::from_yaml_str;
use hpmc_core::{ErrorInfo, HpmcError, Shape};
use serde::{Deserialize, Serialize};

use crate::moves::{ElasticMove, ShapeMove, VertexMove};
use crate::trigger::Trigger;
use crate::updater::ShapeUpdater;
use crate::variant::Variant;

/// YAML-configurable parameters of the shape updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Timesteps on which the updater runs.
    #[serde(default)]
    pub trigger: Trigger,
    /// Sweeps per invocation.
    #[serde(default = "default_nsweeps")]
    pub nsweeps: usize,
    /// Distinct types moved per sweep.
    #[serde(default = "default_type_select")]
    pub type_select: usize,
    /// Run and count moves without ever committing a shape.
    #[serde(default)]
    pub pretend: bool,
    /// Step size for types without an entry in `step_size`.
    #[serde(default = "default_step_size")]
    pub default_step_size: f64,
    /// Step size per type name.
    #[serde(default)]
    pub step_size: BTreeMap<String, f64>,
    /// Master seed.
    #[serde(default)]
    pub seed: u64,
}

fn default_nsweeps() -> usize {
    1
}

fn default_type_select() -> usize {
    1
}

fn default_step_size() -> f64 {
    0.2
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            trigger: Trigger::default(),
            nsweeps: default_nsweeps(),
            type_select: default_type_select(),
            pretend: false,
            default_step_size: default_step_size(),
            step_size: BTreeMap::new(),
            seed: 0,
        }
    }
}

impl UpdaterConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml_str(input: &str) -> Result<Self, HpmcError> {
        from_yaml_str(input)
    }

    /// Step size used for the type called `type_name`.
    pub fn step_size_for(&self, type_name: &str) -> f64 {
        self.step_size
            .get(type_name)
            .copied()
            .unwrap_or(self.default_step_size)
    }

    /// Checks the trigger, sweep counts and step sizes.
    pub fn validate(&self) -> Result<(), HpmcError> {
        self.trigger.validate()?;
        if self.nsweeps == 0 || self.type_select == 0 {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-sweeps", "nsweeps and type_select must be positive")
                    .with_context("nsweeps", self.nsweeps)
                    .with_context("type_select", self.type_select),
            ));
        }
        let steps = std::iter::once(("<default>", self.default_step_size))
            .chain(self.step_size.iter().map(|(k, v)| (k.as_str(), *v)));
        for (name, step) in steps {
            if !(step.is_finite() && step >= 0.0) {
                return Err(HpmcError::Configuration(
                    ErrorInfo::new("invalid-step-size", "step sizes must be finite and non-negative")
                        .with_context("type", name)
                        .with_context("step_size", step),
                ));
            }
        }
        Ok(())
    }
}

/// Serialisable description of a move strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MoveConfig {
    /// Vertex perturbation at fixed volume.
    Vertex {
        /// Probability of attempting a move on a selected type.
        #[serde(default = "default_move_probability")]
        move_probability: f64,
        /// Target volume per type name.
        #[serde(default)]
        volume: BTreeMap<String, f64>,
    },
    /// Deformation under an elastic penalty.
    Elastic {
        /// Probability of attempting a move on a selected type.
        #[serde(default = "default_move_probability")]
        move_probability: f64,
        /// Stiffness schedule.
        stiffness: Variant,
        /// Fraction of stretch proposals.
        #[serde(default = "default_stretch_fraction")]
        stretch_fraction: f64,
        /// Reference shape per type name, replacing the attach-time shape.
        #[serde(default)]
        reference_shape: BTreeMap<String, Shape>,
    },
}

fn default_move_probability() -> f64 {
    1.0
}

fn default_stretch_fraction() -> f64 {
    0.5
}

impl MoveConfig {
    /// Builds the described strategy.
    pub fn build(&self) -> Result<Box<dyn ShapeMove>, HpmcError> {
        match self {
            MoveConfig::Vertex {
                move_probability,
                volume,
            } => {
                let mut strategy = VertexMove::new(*move_probability)?;
                for (name, value) in volume {
                    strategy = strategy.with_volume(name.clone(), *value)?;
                }
                Ok(Box::new(strategy))
            }
            MoveConfig::Elastic {
                move_probability,
                stiffness,
                stretch_fraction,
                reference_shape,
            } => {
                let mut strategy = ElasticMove::new(*stiffness, *move_probability)?
                    .with_stretch_fraction(*stretch_fraction)?;
                for (name, shape) in reference_shape {
                    strategy = strategy.with_reference_shape(name.clone(), shape.clone())?;
                }
                Ok(Box::new(strategy))
            }
        }
    }
}

/// Updater settings together with the strategy they drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Updater settings.
    #[serde(default)]
    pub updater: UpdaterConfig,
    /// Move strategy.
    pub strategy: MoveConfig,
}

impl RunConfig {
    /// Parses a run configuration from YAML.
    pub fn from_yaml_str(input: &str) -> Result<Self, HpmcError> {
        from_yaml_str(input)
    }

    /// Builds an idle updater for this configuration.
    pub fn build_updater(&self) -> Result<ShapeUpdater, HpmcError> {
        ShapeUpdater::new(self.updater.clone(), self.strategy.build()?)
    }
}
