//! Time-dependent scalars used for the elastic stiffness.

use hpmc_core::{ErrorInfo, HpmcError};
use serde::{Deserialize, Serialize};

/// Scalar that varies with the simulation timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// Same value at every step.
    Constant {
        /// The value.
        value: f64,
    },
    /// Linear interpolation from `a` to `b` over `t_ramp` steps starting at `t_start`.
    Ramp {
        /// Value before the ramp.
        a: f64,
        /// Value after the ramp.
        b: f64,
        /// First step of the ramp.
        t_start: u64,
        /// Length of the ramp in steps.
        t_ramp: u64,
    },
    /// Repeating hold-ramp-hold-ramp cycle between `a` and `b`.
    Cycle {
        /// Low value.
        a: f64,
        /// High value.
        b: f64,
        /// First step of the first cycle.
        t_start: u64,
        /// Steps held at `a`.
        t_a: u64,
        /// Steps ramping from `a` to `b`.
        t_up: u64,
        /// Steps held at `b`.
        t_b: u64,
        /// Steps ramping from `b` back to `a`.
        t_down: u64,
    },
    /// Interpolation from `a` to `b` that is linear in `value^(1/power)`.
    Power {
        /// Value before the ramp.
        a: f64,
        /// Value after the ramp.
        b: f64,
        /// Exponent of the interpolation.
        power: f64,
        /// First step of the ramp.
        t_start: u64,
        /// Length of the ramp in steps.
        t_ramp: u64,
    },
}

impl Variant {
    /// Shorthand for [`Variant::Constant`].
    pub fn constant(value: f64) -> Self {
        Variant::Constant { value }
    }

    /// Evaluates the variant at `timestep`.
    pub fn value(&self, timestep: u64) -> f64 {
        match *self {
            Variant::Constant { value } => value,
            Variant::Ramp {
                a,
                b,
                t_start,
                t_ramp,
            } => {
                if timestep < t_start {
                    a
                } else if timestep >= t_start + t_ramp {
                    b
                } else {
                    let frac = (timestep - t_start) as f64 / t_ramp as f64;
                    a + (b - a) * frac
                }
            }
            Variant::Cycle {
                a,
                b,
                t_start,
                t_a,
                t_up,
                t_b,
                t_down,
            } => {
                let period = t_a + t_up + t_b + t_down;
                if timestep < t_start || period == 0 {
                    return a;
                }
                let tc = (timestep - t_start) % period;
                if tc < t_a {
                    a
                } else if tc < t_a + t_up {
                    a + (b - a) * (tc - t_a) as f64 / t_up as f64
                } else if tc < t_a + t_up + t_b {
                    b
                } else {
                    b - (b - a) * (tc - t_a - t_up - t_b) as f64 / t_down as f64
                }
            }
            Variant::Power {
                a,
                b,
                power,
                t_start,
                t_ramp,
            } => {
                if timestep < t_start {
                    a
                } else if timestep >= t_start + t_ramp {
                    b
                } else {
                    let inv_a = a.powf(1.0 / power);
                    let inv_b = b.powf(1.0 / power);
                    let frac = (timestep - t_start) as f64 / t_ramp as f64;
                    ((inv_b - inv_a) * frac + inv_a).powf(power)
                }
            }
        }
    }

    /// Checks that every parameter is finite and that power variants stay positive.
    pub fn validate(&self) -> Result<(), HpmcError> {
        let finite = match *self {
            Variant::Constant { value } => value.is_finite(),
            Variant::Ramp { a, b, .. } | Variant::Cycle { a, b, .. } => {
                a.is_finite() && b.is_finite()
            }
            Variant::Power { a, b, power, .. } => {
                a.is_finite() && b.is_finite() && power.is_finite() && power != 0.0
            }
        };
        let positive = match *self {
            Variant::Power { a, b, .. } => a > 0.0 && b > 0.0,
            _ => true,
        };
        if !(finite && positive) {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-variant", "variant parameters are out of range")
                    .with_context("variant", format!("{self:?}")),
            ));
        }
        Ok(())
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::constant(0.0)
    }
}
