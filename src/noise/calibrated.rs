//! Count-dependent Laplace scales for preset noise levels.
//!
//! Each count is perturbed with its own Laplace draw whose scale depends on
//! the configured [`NoiseLevel`] and, for [`ScaleSchedule::Sigmoid`], on the
//! ratio of the count to a reference size. That size is the partition
//! length, except when the search targets the global minimum or maximum:
//! then it is the number of partition elements still inside the search
//! interval, which keeps the scale meaningful as the interval shrinks.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::laplace::sample_laplace;
use super::CountContext;
use crate::counting::CountPair;

/// Preset noise intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseLevel {
    /// No perturbation.
    None,
    /// Light perturbation.
    Low,
    /// Moderate perturbation.
    Medium,
    /// Heavy perturbation.
    High,
}

impl NoiseLevel {
    /// Map a sweep parameter in `[0, 1]` onto a level by quartile.
    pub fn from_fraction(p: f64) -> Self {
        if p < 0.25 {
            NoiseLevel::None
        } else if p < 0.5 {
            NoiseLevel::Low
        } else if p < 0.75 {
            NoiseLevel::Medium
        } else {
            NoiseLevel::High
        }
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseLevel::None => write!(f, "none"),
            NoiseLevel::Low => write!(f, "low"),
            NoiseLevel::Medium => write!(f, "medium"),
            NoiseLevel::High => write!(f, "high"),
        }
    }
}

/// How a [`NoiseLevel`] turns into a Laplace scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleSchedule {
    /// Constant scale per level, independent of the count.
    Fixed,
    /// Sigmoid in `count / size`, capped by `log_100(size)` times a level factor.
    #[default]
    Sigmoid,
}

impl ScaleSchedule {
    /// Laplace scale for a count of `count` in a partition of `size` elements.
    pub fn scale(self, level: NoiseLevel, count: usize, size: usize) -> f64 {
        match self {
            ScaleSchedule::Fixed => match level {
                NoiseLevel::None => 0.0,
                NoiseLevel::Low => 0.2,
                NoiseLevel::Medium => 0.5,
                NoiseLevel::High => 2.0,
            },
            ScaleSchedule::Sigmoid => {
                let size = size.max(1) as f64;
                let cap = size.log(100.0);
                let (compression, limit) = match level {
                    NoiseLevel::None => return 0.0,
                    NoiseLevel::Low => (5.0, cap),
                    NoiseLevel::Medium => (10.0, 1.5 * cap),
                    NoiseLevel::High => (15.0, 2.0 * cap),
                };
                let ratio = count as f64 / size;
                limit / (1.0 + (-ratio * compression + 5.0).exp())
            }
        }
    }
}

/// Perturb both counts independently, then shrink them proportionally if
/// their sum exceeds the partition size.
///
/// Returns the perturbed pair and the two raw Laplace draws.
pub(crate) fn perturb_calibrated<R: Rng + ?Sized>(
    level: NoiseLevel,
    schedule: ScaleSchedule,
    exact: CountPair,
    ctx: CountContext,
    rng: &mut R,
) -> (CountPair, f64, f64) {
    let (mut less, less_draw) = noisy_count(level, schedule, exact.less, ctx.range_len, rng);
    let (mut greater, greater_draw) =
        noisy_count(level, schedule, exact.greater, ctx.range_len, rng);

    let size = ctx.partition_len;
    let sum = less.saturating_add(greater);
    if sum > size {
        let excess = (sum - size) as f64;
        let less_cut = (less as f64 / sum as f64 * excess).round() as usize;
        let greater_cut = (greater as f64 / sum as f64 * excess).round() as usize;
        less = less.saturating_sub(less_cut);
        greater = greater.saturating_sub(greater_cut);
    }
    (CountPair { less, greater }, less_draw, greater_draw)
}

fn noisy_count<R: Rng + ?Sized>(
    level: NoiseLevel,
    schedule: ScaleSchedule,
    count: usize,
    scale_size: usize,
    rng: &mut R,
) -> (usize, f64) {
    let draw = sample_laplace(rng, schedule.scale(level, count, scale_size));
    let noisy = i64::try_from(count)
        .unwrap_or(i64::MAX)
        .saturating_add(draw.round() as i64);
    (noisy.max(0) as usize, draw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_none_level_has_zero_scale() {
        for schedule in [ScaleSchedule::Fixed, ScaleSchedule::Sigmoid] {
            for count in [0, 5, 100] {
                assert_eq!(schedule.scale(NoiseLevel::None, count, 100), 0.0);
            }
        }
    }

    #[test]
    fn test_sigmoid_increases_with_ratio_and_level() {
        let s = ScaleSchedule::Sigmoid;
        let low = s.scale(NoiseLevel::Low, 10, 1000);
        let high_ratio = s.scale(NoiseLevel::Low, 900, 1000);
        assert!(high_ratio > low);
        assert!(s.scale(NoiseLevel::High, 500, 1000) > s.scale(NoiseLevel::Medium, 500, 1000));
        // Capped by 2 * log_100(size) at the top level.
        assert!(s.scale(NoiseLevel::High, 1000, 1000) <= 2.0 * 1000f64.log(100.0));
    }

    #[test]
    fn test_from_fraction_quartiles() {
        assert_eq!(NoiseLevel::from_fraction(0.0), NoiseLevel::None);
        assert_eq!(NoiseLevel::from_fraction(0.3), NoiseLevel::Low);
        assert_eq!(NoiseLevel::from_fraction(0.6), NoiseLevel::Medium);
        assert_eq!(NoiseLevel::from_fraction(1.0), NoiseLevel::High);
    }

    #[test]
    fn test_calibrated_never_exceeds_size_by_much() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..2_000 {
            let (pair, _, _) = perturb_calibrated(
                NoiseLevel::High,
                ScaleSchedule::Fixed,
                CountPair::new(40, 58),
                CountContext::whole(100),
                &mut rng,
            );
            // Proportional rounding may leave at most one element of slack.
            assert!(pair.less + pair.greater <= 101, "{:?}", pair);
        }
    }

    #[test]
    fn test_none_level_is_identity() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let exact = CountPair::new(12, 80);
        for schedule in [ScaleSchedule::Fixed, ScaleSchedule::Sigmoid] {
            let (pair, _, _) =
                perturb_calibrated(NoiseLevel::None, schedule, exact, CountContext::whole(100), &mut rng);
            assert_eq!(pair, exact);
        }
    }

    #[test]
    fn test_sigmoid_scale_follows_range_len() {
        // Same counts, narrower interval: the ratio grows, and so does the noise.
        let exact = CountPair::new(5, 5);
        let spread = |range_len: usize| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
            let ctx = CountContext {
                partition_len: 10_000,
                range_len,
            };
            (0..2_000)
                .map(|_| {
                    let (_, less_draw, _) = perturb_calibrated(
                        NoiseLevel::High,
                        ScaleSchedule::Sigmoid,
                        exact,
                        ctx,
                        &mut rng,
                    );
                    less_draw.abs()
                })
                .sum::<f64>()
        };
        assert!(spread(10) > 10.0 * spread(10_000));
    }

    #[test]
    fn test_huge_counts_saturate() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let (pair, _, _) = perturb_calibrated(
            NoiseLevel::High,
            ScaleSchedule::Fixed,
            CountPair::new(usize::MAX, usize::MAX),
            CountContext::whole(usize::MAX),
            &mut rng,
        );
        assert!(pair.less > 0 && pair.greater > 0);
    }
}
