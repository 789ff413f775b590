use hpmc_core::derive_seed_path;

/// Derives the seed for free-volume trial `sample` taken at `timestep`.
pub fn sample_seed(master_seed: u64, timestep: u64, sample: usize) -> u64 {
    derive_seed_path(master_seed, &[timestep, sample as u64])
}
