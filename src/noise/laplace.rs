//! Laplace sampling via the inverse CDF.
//!
//! For u ~ Uniform(0, 1):
//!
//! ```text
//! F^-1(u) = -b * sign(u - 0.5) * ln(1 - 2|u - 0.5|)
//! ```
//!
//! is distributed as Laplace(0, b).

use rand::distr::Open01;
use rand::Rng;

/// Draw one sample from Laplace(0, `scale`).
///
/// A scale that is not strictly positive (including NaN) yields `0.0`.
pub fn sample_laplace<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    if scale.is_nan() || scale <= 0.0 {
        return 0.0;
    }
    // Open interval keeps ln() finite at both ends.
    let u: f64 = rng.sample(Open01);
    let centered = u - 0.5;
    -scale * centered.signum() * (1.0 - 2.0 * centered.abs()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_zero_scale_is_exact() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(sample_laplace(&mut rng, 0.0), 0.0);
            assert_eq!(sample_laplace(&mut rng, f64::NAN), 0.0);
        }
    }

    #[test]
    fn test_moments() {
        // Laplace(0, b): mean 0, E|X| = b.
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let b = 2.0;
        let n = 200_000;
        let samples: Vec<f64> = (0..n).map(|_| sample_laplace(&mut rng, b)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let mean_abs = samples.iter().map(|x| x.abs()).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((mean_abs - b).abs() < 0.05, "E|X| = {}", mean_abs);
        assert!(samples.iter().all(|x| x.is_finite()));
    }
}
