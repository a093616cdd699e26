//! Perturbation of per-partition counts.
//!
//! Each partition's exact [`CountPair`] passes through a [`NoiseModel`]
//! before the aggregator sums them, so noise is injected at the partition
//! level rather than after aggregation.
//!
//! Two parameterizations share the sweep axis but mean different things:
//! - [`NoiseModel::BernoulliShift`] takes a *probability* (`shift_probability`)
//!   of nudging the counts by one.
//! - [`NoiseModel::Laplace`] takes a continuous *scale* (`laplace_scale`),
//!   obtained in a sweep as `parameter * max_scale`.
//!
//! [`NoiseKind`] describes the family a sweep runs over and turns a grid
//! parameter into a concrete model.

mod calibrated;
mod laplace;

pub use calibrated::{NoiseLevel, ScaleSchedule};
pub use laplace::sample_laplace;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::counting::CountPair;
use crate::error::{Error, Result};

/// What a perturbation may know about the partition it is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountContext {
    /// Elements in the partition.
    pub partition_len: usize,
    /// Elements of the partition inside the current search interval.
    pub range_len: usize,
}

impl CountContext {
    /// Context for a partition that lies entirely inside the interval.
    pub fn whole(partition_len: usize) -> Self {
        Self {
            partition_len,
            range_len: partition_len,
        }
    }
}

/// A strategy for perturbing one partition's counts.
///
/// Implementations must return non-negative counts (guaranteed by `usize`)
/// and must not hold state that changes across calls.
pub trait Perturbation {
    /// Reject parameters that would make [`perturb`](Self::perturb)
    /// meaningless. The default accepts everything.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNoiseParameter`] for an out-of-range parameter.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Perturb the exact counts of a partition.
    fn perturb<R: Rng + ?Sized>(&self, exact: CountPair, ctx: CountContext, rng: &mut R)
        -> CountPair;

    /// Like [`perturb`](Self::perturb), appending every raw noise draw to
    /// `draws`. The default records nothing.
    fn perturb_recorded<R: Rng + ?Sized>(
        &self,
        exact: CountPair,
        ctx: CountContext,
        rng: &mut R,
        draws: &mut Vec<f64>,
    ) -> CountPair {
        let _ = draws;
        self.perturb(exact, ctx, rng)
    }
}

/// Concrete noise model with its parameters fixed for one search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// Counts pass through unchanged.
    Identity,
    /// With probability `shift_probability`, move `less` and `greater` by
    /// independent draws from {-1, 0, 1}.
    BernoulliShift {
        /// Probability in `[0, 1]` of shifting the counts.
        shift_probability: f64,
    },
    /// Add one shared Laplace draw to `less` and subtract it from `greater`.
    Laplace {
        /// Laplace scale, `>= 0`.
        laplace_scale: f64,
    },
    /// Independent, count-dependent Laplace draws per count.
    Calibrated {
        /// Preset intensity.
        level: NoiseLevel,
        /// Scale schedule.
        schedule: ScaleSchedule,
    },
}

impl NoiseModel {
    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNoiseParameter`] for a probability outside `[0, 1]` or
    /// a negative or non-finite scale.
    pub fn validate(&self) -> Result<()> {
        match *self {
            NoiseModel::BernoulliShift { shift_probability } => {
                if !(0.0..=1.0).contains(&shift_probability) {
                    return Err(Error::InvalidNoiseParameter {
                        name: "shift_probability",
                        value: shift_probability,
                    });
                }
            }
            NoiseModel::Laplace { laplace_scale } => {
                if !laplace_scale.is_finite() || laplace_scale < 0.0 {
                    return Err(Error::InvalidNoiseParameter {
                        name: "laplace_scale",
                        value: laplace_scale,
                    });
                }
            }
            NoiseModel::Identity | NoiseModel::Calibrated { .. } => {}
        }
        Ok(())
    }

    /// Whether this model leaves every count unchanged.
    pub fn is_exact(&self) -> bool {
        match *self {
            NoiseModel::Identity => true,
            NoiseModel::BernoulliShift { shift_probability } => shift_probability == 0.0,
            NoiseModel::Laplace { laplace_scale } => laplace_scale == 0.0,
            NoiseModel::Calibrated { level, .. } => level == NoiseLevel::None,
        }
    }
}

impl NoiseModel {
    fn apply<R: Rng + ?Sized>(
        &self,
        exact: CountPair,
        ctx: CountContext,
        rng: &mut R,
        mut draws: Option<&mut Vec<f64>>,
    ) -> CountPair {
        let mut record = |draw: f64| {
            if let Some(draws) = draws.as_deref_mut() {
                draws.push(draw);
            }
        };
        match *self {
            NoiseModel::Identity => exact,
            NoiseModel::BernoulliShift { shift_probability } => {
                // Must not panic on an unvalidated probability.
                let shifted = rng.random::<f64>() < shift_probability;
                if !shifted {
                    return exact;
                }
                let less_shift: isize = rng.random_range(-1i64..=1) as isize;
                let greater_shift: isize = rng.random_range(-1i64..=1) as isize;
                record(less_shift as f64);
                record(greater_shift as f64);
                CountPair {
                    less: exact.less.saturating_add_signed(less_shift),
                    greater: exact.greater.saturating_add_signed(-greater_shift),
                }
            }
            NoiseModel::Laplace { laplace_scale } => {
                let eps = sample_laplace(rng, laplace_scale);
                record(eps);
                // Float to integer casts saturate, so huge draws stay in range.
                CountPair {
                    less: (exact.less as f64 + eps).trunc().max(0.0) as usize,
                    greater: (exact.greater as f64 - eps).trunc().max(0.0) as usize,
                }
            }
            NoiseModel::Calibrated { level, schedule } => {
                let (pair, less_draw, greater_draw) =
                    calibrated::perturb_calibrated(level, schedule, exact, ctx, rng);
                if level != NoiseLevel::None {
                    record(less_draw);
                    record(greater_draw);
                }
                pair
            }
        }
    }
}

impl Perturbation for NoiseModel {
    fn validate(&self) -> Result<()> {
        NoiseModel::validate(self)
    }

    fn perturb<R: Rng + ?Sized>(&self, exact: CountPair, ctx: CountContext, rng: &mut R) -> CountPair {
        self.apply(exact, ctx, rng, None)
    }

    fn perturb_recorded<R: Rng + ?Sized>(
        &self,
        exact: CountPair,
        ctx: CountContext,
        rng: &mut R,
        draws: &mut Vec<f64>,
    ) -> CountPair {
        self.apply(exact, ctx, rng, Some(draws))
    }
}

/// Noise family swept by an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NoiseKind {
    /// No noise; the sweep parameter is ignored.
    Identity,
    /// Parameter is the shift probability.
    BernoulliShift,
    /// Parameter multiplies `max_scale` to give the Laplace scale.
    Laplace {
        /// Scale reached at parameter 1.0.
        max_scale: f64,
    },
    /// Parameter selects a [`NoiseLevel`] by quartile.
    Calibrated {
        /// Scale schedule.
        schedule: ScaleSchedule,
    },
}

impl NoiseKind {
    /// Build the model for sweep parameter `parameter` in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNoiseParameter`] if `parameter` is outside `[0, 1]` or
    /// the resulting model is invalid.
    pub fn model(&self, parameter: f64) -> Result<NoiseModel> {
        if !(0.0..=1.0).contains(&parameter) {
            return Err(Error::InvalidNoiseParameter {
                name: "noise_parameter",
                value: parameter,
            });
        }
        let model = match *self {
            NoiseKind::Identity => NoiseModel::Identity,
            NoiseKind::BernoulliShift => NoiseModel::BernoulliShift {
                shift_probability: parameter,
            },
            NoiseKind::Laplace { max_scale } => NoiseModel::Laplace {
                laplace_scale: parameter * max_scale,
            },
            NoiseKind::Calibrated { schedule } => NoiseModel::Calibrated {
                level: NoiseLevel::from_fraction(parameter),
                schedule,
            },
        };
        model.validate()?;
        Ok(model)
    }

    /// Value plotted on the x-axis for `parameter`.
    ///
    /// For Laplace this is the effective scale; otherwise the parameter itself.
    pub fn axis_value(&self, parameter: f64) -> f64 {
        match *self {
            NoiseKind::Laplace { max_scale } => parameter * max_scale,
            _ => parameter,
        }
    }

    /// Short identifier used in file names and reports.
    pub fn label(&self) -> &'static str {
        match self {
            NoiseKind::Identity => "identity",
            NoiseKind::BernoulliShift => "bernoulli",
            NoiseKind::Laplace { .. } => "laplace",
            NoiseKind::Calibrated { .. } => "calibrated",
        }
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseKind::Laplace { max_scale } => write!(f, "laplace(max_scale={})", max_scale),
            NoiseKind::Calibrated { schedule } => write!(f, "calibrated({:?})", schedule),
            other => f.write_str(other.label()),
        }
    }
}
