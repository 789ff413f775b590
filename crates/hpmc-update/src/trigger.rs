use hpmc_core::{ErrorInfo, HpmcError};
use serde::{Deserialize, Serialize};

/// Decides on which timesteps the shape updater runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Every `period` steps, starting at `phase`.
    Periodic {
        /// Steps between activations.
        period: u64,
        /// First active timestep.
        #[serde(default)]
        phase: u64,
    },
    /// Strictly after `timestep`.
    After {
        /// Last inactive timestep.
        timestep: u64,
    },
    /// Strictly before `timestep`.
    Before {
        /// First inactive timestep.
        timestep: u64,
    },
    /// Exactly at `timestep`.
    On {
        /// The only active timestep.
        timestep: u64,
    },
}

impl Default for Trigger {
    fn default() -> Self {
        Trigger::Periodic {
            period: 1,
            phase: 0,
        }
    }
}

impl Trigger {
    /// Returns true when the updater should run at `timestep`.
    pub fn is_active(&self, timestep: u64) -> bool {
        match *self {
            Trigger::Periodic { period, phase } => {
                period > 0 && timestep >= phase && (timestep - phase) % period == 0
            }
            Trigger::After { timestep: t } => timestep > t,
            Trigger::Before { timestep: t } => timestep < t,
            Trigger::On { timestep: t } => timestep == t,
        }
    }

    /// Rejects a periodic trigger with a zero period.
    pub fn validate(&self) -> Result<(), HpmcError> {
        if let Trigger::Periodic { period: 0, .. } = self {
            return Err(HpmcError::Configuration(
                ErrorInfo::new("invalid-trigger", "periodic trigger needs a positive period")
                    .with_hint("use period: 1 to run on every step"),
            ));
        }
        Ok(())
    }
}
