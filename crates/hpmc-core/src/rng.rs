//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle used by every sampler in the workspace.
///
/// The handle wraps `StdRng`. Callers never share one handle across
/// independent trials: each trial derives its own substream seed with
/// [`derive_substream_seed`] (SipHash-1-3 with zero keys over
/// `(master_seed, substream_id)`), so results depend only on the trial index
/// and never on the order in which worker threads reach it.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a handle for the substream path `(seed, keys...)`.
    pub fn from_path(seed: u64, keys: &[u64]) -> Self {
        Self::from_seed(derive_seed_path(seed, keys))
    }

    /// Draws a uniform real in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws a uniform real in `[lo, hi)`; returns `lo` for an empty interval.
    pub fn uniform_in(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Folds a sequence of substream keys into a single seed.
pub fn derive_seed_path(master_seed: u64, keys: &[u64]) -> u64 {
    keys.iter()
        .fold(master_seed, |seed, &key| derive_substream_seed(seed, key))
}
