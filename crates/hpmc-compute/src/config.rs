//! YAML-configurable parameters for the estimators.

use hpmc_core::serialization::from_yaml_str;
use hpmc_core::{ErrorInfo, HpmcError};
use serde::{Deserialize, Serialize};

/// Parameters of a free-volume estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeVolumeConfig {
    /// Particle type whose shape is used as the probe.
    #[serde(default)]
    pub test_particle_type: usize,
    /// Number of independent trial insertions.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Master seed for the trial substreams.
    #[serde(default)]
    pub seed: u64,
    /// Worker threads; zero selects the global rayon pool.
    #[serde(default)]
    pub threads: usize,
}

fn default_num_samples() -> usize {
    1000
}

impl Default for FreeVolumeConfig {
    fn default() -> Self {
        Self {
            test_particle_type: 0,
            num_samples: default_num_samples(),
            seed: 0,
            threads: 0,
        }
    }
}

impl FreeVolumeConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self, HpmcError> {
        from_yaml_str(contents)
    }

    /// Checks that at least one trial is requested.
    pub fn validate(&self) -> Result<(), HpmcError> {
        if self.num_samples == 0 {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-samples", "num_samples must be positive")
                    .with_hint("request at least one trial insertion"),
            ));
        }
        Ok(())
    }
}

/// Parameters of the scale distribution function histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdfConfig {
    /// Largest scale factor tracked by the histogram.
    #[serde(default = "default_xmax")]
    pub xmax: f64,
    /// Histogram bin width.
    #[serde(default = "default_dx")]
    pub dx: f64,
    /// Worker threads; zero selects the global rayon pool.
    #[serde(default)]
    pub threads: usize,
}

fn default_xmax() -> f64 {
    0.02
}

fn default_dx() -> f64 {
    1e-4
}

impl Default for SdfConfig {
    fn default() -> Self {
        Self {
            xmax: default_xmax(),
            dx: default_dx(),
            threads: 0,
        }
    }
}

impl SdfConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self, HpmcError> {
        from_yaml_str(contents)
    }

    /// Checks `0 < dx <= xmax < 1`.
    pub fn validate(&self) -> Result<(), HpmcError> {
        let valid = self.xmax.is_finite()
            && self.dx.is_finite()
            && self.dx > 0.0
            && self.xmax < 1.0
            && self.dx <= self.xmax;
        if !valid {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-histogram", "require 0 < dx <= xmax < 1")
                    .with_context("xmax", self.xmax)
                    .with_context("dx", self.dx),
            ));
        }
        Ok(())
    }

    /// Number of histogram bins, `ceil(xmax / dx)`.
    pub fn bin_count(&self) -> usize {
        bin_count(self.xmax, self.dx)
    }
}

pub(crate) fn bin_count(xmax: f64, dx: f64) -> usize {
    ((xmax / dx) - 1e-8).ceil().max(1.0) as usize
}
