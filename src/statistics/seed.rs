//! Deterministic per-trial seeding.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Counter-based RNG seed generation using SplitMix64.
///
/// A stateless PRF giving well-distributed seeds from a base seed and a
/// counter, so consecutive counters do not produce correlated streams.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Seed for one trial, derived by chaining the counter through each
/// coordinate of the experiment grid.
pub fn trial_seed(base_seed: u64, combination: usize, grid_point: usize, trial: usize) -> u64 {
    let s = counter_rng_seed(base_seed, combination as u64);
    let s = counter_rng_seed(s, grid_point as u64);
    counter_rng_seed(s, trial as u64)
}

/// Fresh generator for one trial.
pub fn trial_rng(base_seed: u64, combination: usize, grid_point: usize, trial: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(trial_seed(base_seed, combination, grid_point, trial))
}
