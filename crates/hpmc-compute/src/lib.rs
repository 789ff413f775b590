#![deny(missing_docs)]
#![doc = "Monte Carlo free-volume and scale distribution function estimators over hard-particle configurations."]

pub mod config;
/// Per-sample seed derivation.
pub mod determinism;
mod dispatch;
pub mod fit;
pub mod free_volume;
pub mod sdf;

pub use config::{FreeVolumeConfig, SdfConfig};
pub use fit::{polyfit, polyval};
pub use free_volume::{FreeVolume, FreeVolumeEstimate};
pub use sdf::{Sdf, SdfHistogram};
