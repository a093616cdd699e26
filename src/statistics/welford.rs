//! Online mean/variance accumulation (Welford).

use serde::{Deserialize, Serialize};

/// Running count, mean, variance and maximum of a stream of values.
///
/// Update:
/// ```text
/// δ  = x - μₙ₋₁
/// μₙ = μₙ₋₁ + δ/n
/// M2ₙ = M2ₙ₋₁ + δ·(x - μₙ)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    n: usize,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RunningStats {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn update(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
        if self.n == 1 || x > self.max {
            self.max = x;
        }
    }

    /// Number of observations.
    pub fn count(&self) -> usize {
        self.n
    }

    /// Mean, or 0.0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance; 0.0 for fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        self.m2 / (self.n - 1) as f64
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Largest observation, or 0.0 when empty.
    pub fn max(&self) -> f64 {
        self.max
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for x in iter {
            stats.update(x);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_batch_computation() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats: RunningStats = data.iter().copied().collect();

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.variance() - var).abs() < 1e-12);
        assert_eq!(stats.max(), 9.0);
    }

    #[test]
    fn test_degenerate_cases() {
        let empty = RunningStats::new();
        assert_eq!(empty.mean(), 0.0);
        assert_eq!(empty.variance(), 0.0);

        let one: RunningStats = std::iter::once(-3.0).collect();
        assert_eq!(one.mean(), -3.0);
        assert_eq!(one.max(), -3.0);
        assert_eq!(one.std_dev(), 0.0);
    }
}
