//! Result types produced by an experiment run.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::noise::NoiseKind;
use crate::reference::RankTarget;
use crate::search::SearchResult;

/// One search outcome tagged with where it sits in the experiment grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Concrete rank searched for.
    pub k: usize,
    /// Noise family.
    pub noise: NoiseKind,
    /// Sweep parameter in `[0, 1]`.
    pub parameter: f64,
    /// Trial index within the grid point.
    pub trial: usize,
    /// Search outcome.
    pub result: SearchResult,
    /// Exact k-th element.
    pub reference: i64,
}

impl TrialRecord {
    /// Absolute deviation of the estimate from the reference.
    pub fn deviation(&self) -> u64 {
        self.result.deviation(self.reference)
    }
}

/// Aggregates for one grid point of one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Sweep parameter in `[0, 1]`.
    pub parameter: f64,
    /// Value on the x-axis (effective Laplace scale for Laplace sweeps).
    pub axis_value: f64,
    /// Mean `|estimate - reference|`.
    pub mean_abs_deviation: f64,
    /// Standard deviation of `|estimate - reference|`.
    pub deviation_std: f64,
    /// 90th percentile of `|estimate - reference|`.
    pub p90_deviation: f64,
    /// Largest `|estimate - reference|`.
    pub max_deviation: f64,
    /// Mean rounds per search.
    pub mean_iterations: f64,
    /// Searches that hit the iteration ceiling.
    pub abandoned: usize,
    /// Every trial's estimate, when the experiment keeps samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimates: Option<Vec<i64>>,
    /// Every raw noise draw of every trial, in trial order, when the
    /// experiment keeps noise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_draws: Option<Vec<f64>>,
}

/// Sweep results for one (noise family, rank) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationReport {
    /// Noise family swept.
    pub noise: NoiseKind,
    /// Rank target.
    pub rank: RankTarget,
    /// Resolved rank `k` (0 if it could not be resolved).
    pub k: usize,
    /// Exact k-th element, if the combination ran.
    pub reference: Option<i64>,
    /// One entry per grid point, in grid order.
    pub points: Vec<GridPoint>,
    /// Why the combination failed, if it did. Siblings are unaffected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CombinationReport {
    /// Stable file-name stem, e.g. `laplace_median`.
    pub fn stem(&self) -> String {
        format!("{}_{}", self.noise.label(), self.rank)
    }

    /// Whether the combination completed.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Mean absolute deviation per grid point.
    pub fn deviation_series(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_abs_deviation).collect()
    }

    /// Mean iteration count per grid point.
    pub fn iteration_series(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_iterations).collect()
    }

    /// x-axis values per grid point.
    pub fn axis(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.axis_value).collect()
    }

    /// Raw noise draws at the noisiest grid point, if kept.
    pub fn last_noise_draws(&self) -> Option<&[f64]> {
        self.points.last()?.noise_draws.as_deref()
    }

    /// Total abandoned searches over the sweep.
    pub fn abandoned(&self) -> usize {
        self.points.iter().map(|p| p.abandoned).sum()
    }
}

/// Summary of the partitions an experiment ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Number of partitions.
    pub partitions: usize,
    /// Total element count N.
    pub total: usize,
    /// Global minimum.
    pub min: i64,
    /// Global maximum.
    pub max: i64,
}

/// Complete output of [`Experiment::run`](crate::Experiment::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Configuration used.
    pub config: Config,
    /// Partitions searched.
    pub partitions: PartitionSummary,
    /// One report per (noise family, rank), noise-major order.
    pub combinations: Vec<CombinationReport>,
    /// Wall-clock runtime in seconds.
    pub runtime_secs: f64,
}

impl ExperimentReport {
    /// Look up a combination.
    pub fn combination(&self, noise_label: &str, rank: RankTarget) -> Option<&CombinationReport> {
        self.combinations
            .iter()
            .find(|c| c.noise.label() == noise_label && c.rank == rank)
    }

    /// Combinations that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CombinationReport> {
        self.combinations.iter().filter(|c| !c.is_ok())
    }
}
