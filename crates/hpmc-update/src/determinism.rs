use hpmc_core::derive_seed_path;

/// Derives the seed used to pick the types moved during `sweep` at `timestep`.
pub fn selection_seed(master_seed: u64, timestep: u64, sweep: usize) -> u64 {
    derive_seed_path(master_seed, &[timestep, sweep as u64])
}

/// Derives the seed for the move in `slot` of `sweep` at `timestep`.
pub fn move_seed(master_seed: u64, timestep: u64, sweep: usize, slot: usize) -> u64 {
    derive_seed_path(master_seed, &[timestep, sweep as u64, slot as u64])
}
