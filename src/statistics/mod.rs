//! Summary statistics over repeated trials.
//!
//! - Welford running mean/variance for deviations and iteration counts
//! - Interpolated percentiles of deviations
//! - Counter-based seed derivation so every trial owns an independent RNG

mod quantile;
mod seed;
mod welford;

pub use quantile::percentile;
pub use seed::{counter_rng_seed, trial_rng, trial_seed};
pub use welford::RunningStats;

/// Signed deviation of each estimate from `reference`, in percent of the
/// reference. Returns an empty vector when `reference` is zero.
pub fn deviation_percentages(estimates: &[i64], reference: i64) -> Vec<f64> {
    if reference == 0 {
        return Vec::new();
    }
    let reference = reference as f64;
    estimates
        .iter()
        .map(|&x| (x as f64 - reference) / reference * 100.0)
        .collect()
}
