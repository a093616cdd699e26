//! Configuration for noise-sweep experiments.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::noise::{NoiseKind, ScaleSchedule};
use crate::partition::{GenerationSpec, SizeDistribution};
use crate::reference::RankTarget;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x5eed_f00d;

/// Iteration ceiling used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Configuration options for [`Experiment`](crate::Experiment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How partitions are generated.
    pub generation: GenerationSpec,

    /// Seed for partition generation and per-trial noise (default: [`DEFAULT_SEED`]).
    pub seed: u64,

    /// Ranks to estimate (default: min, median, max).
    pub ranks: Vec<RankTarget>,

    /// Noise families to sweep (default: Bernoulli shift and Laplace with max scale 2).
    pub noise_kinds: Vec<NoiseKind>,

    /// Searches per grid point (default: 1,000).
    pub trials: usize,

    /// Number of grid points in `[0, 1]`, endpoints included (default: 100).
    pub resolution: usize,

    /// Abandon a search after this many rounds; `None` runs without bound
    /// (default: 10,000).
    pub max_iterations: Option<usize>,

    /// Keep every trial's estimate in the report (default: false).
    pub keep_samples: bool,

    /// Keep every raw noise draw in the report (default: false).
    #[serde(default)]
    pub keep_noise: bool,

    /// Directory for row files and the JSON report, if any.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationSpec::default(),
            seed: DEFAULT_SEED,
            ranks: RankTarget::STANDARD.to_vec(),
            noise_kinds: vec![NoiseKind::BernoulliShift, NoiseKind::Laplace { max_scale: 2.0 }],
            trials: 1_000,
            resolution: 100,
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            keep_samples: false,
            keep_noise: false,
            output_dir: None,
        }
    }
}

impl Config {
    /// Check the configuration before running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            return Err(Error::InvalidConfig(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if self.trials == 0 {
            return Err(Error::InvalidConfig("trials must be positive".into()));
        }
        if self.ranks.is_empty() {
            return Err(Error::InvalidConfig("no rank targets".into()));
        }
        if self.noise_kinds.is_empty() {
            return Err(Error::InvalidConfig("no noise kinds".into()));
        }
        for kind in &self.noise_kinds {
            if let NoiseKind::Laplace { max_scale } = kind {
                if !max_scale.is_finite() || *max_scale < 0.0 {
                    return Err(Error::InvalidNoiseParameter {
                        name: "max_scale",
                        value: *max_scale,
                    });
                }
            }
        }
        Ok(())
    }

    /// The sweep grid: `i / (resolution - 1)` for `i in 0..resolution`.
    pub fn grid(&self) -> Vec<f64> {
        let last = self.resolution.saturating_sub(1).max(1) as f64;
        (0..self.resolution).map(|i| i as f64 / last).collect()
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Merge overrides from environment variables.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `NR_PARTITIONS` | partition count |
    /// | `NR_PARTITION_SIZE` | elements per partition |
    /// | `NR_MIN_VALUE`, `NR_MAX_VALUE` | value range |
    /// | `NR_SIZES` | `equal` or `normal` |
    /// | `NR_SEED` | seed |
    /// | `NR_TRIALS` | trials per grid point |
    /// | `NR_RESOLUTION` | grid points |
    /// | `NR_MAX_SCALE` | Laplace max scale (all Laplace kinds) |
    /// | `NR_NOISE` | comma list of `identity`, `bernoulli`, `laplace`, `calibrated` |
    /// | `NR_MAX_ITERATIONS` | ceiling; `none` or `0` for unbounded |
    /// | `NR_KEEP_SAMPLES` | `1`/`true` to keep raw estimates |
    /// | `NR_KEEP_NOISE` | `1`/`true` to keep raw noise draws |
    /// | `NR_OUTPUT_DIR` | output directory |
    pub fn merge_env(mut self) -> Self {
        if let Some(n) = parse_usize_env("NR_PARTITIONS") {
            self.generation.partitions = n;
        }
        if let Some(n) = parse_usize_env("NR_PARTITION_SIZE") {
            self.generation.partition_size = n;
        }
        if let Some(v) = parse_i64_env("NR_MIN_VALUE") {
            self.generation.min_value = v;
        }
        if let Some(v) = parse_i64_env("NR_MAX_VALUE") {
            self.generation.max_value = v;
        }
        if let Some(sizes) = parse_sizes_env("NR_SIZES") {
            self.generation.sizes = sizes;
        }
        if let Some(seed) = parse_u64_env("NR_SEED") {
            self.seed = seed;
        }
        if let Some(n) = parse_usize_env("NR_TRIALS") {
            self.trials = n;
        }
        if let Some(n) = parse_usize_env("NR_RESOLUTION") {
            self.resolution = n;
        }
        let max_scale = parse_f64_env("NR_MAX_SCALE");
        if let Some(kinds) = parse_noise_env("NR_NOISE", max_scale.unwrap_or(2.0)) {
            self.noise_kinds = kinds;
        } else if let Some(scale) = max_scale {
            for kind in &mut self.noise_kinds {
                if let NoiseKind::Laplace { max_scale } = kind {
                    *max_scale = scale;
                }
            }
        }
        if let Ok(raw) = env::var("NR_MAX_ITERATIONS") {
            let raw = raw.trim().to_ascii_lowercase();
            if raw == "none" || raw == "0" {
                self.max_iterations = None;
            } else if let Ok(n) = raw.parse() {
                self.max_iterations = Some(n);
            }
        }
        if let Some(keep) = parse_bool_env("NR_KEEP_SAMPLES") {
            self.keep_samples = keep;
        }
        if let Some(keep) = parse_bool_env("NR_KEEP_NOISE") {
            self.keep_noise = keep;
        }
        if let Some(path) = parse_path_env("NR_OUTPUT_DIR") {
            self.output_dir = Some(path);
        }
        self
    }
}

fn parse_usize_env(key: &str) -> Option<usize> {
    env::var(key).ok()?.parse().ok()
}

fn parse_u64_env(key: &str) -> Option<u64> {
    env::var(key).ok()?.parse().ok()
}

fn parse_i64_env(key: &str) -> Option<i64> {
    env::var(key).ok()?.parse().ok()
}

fn parse_f64_env(key: &str) -> Option<f64> {
    env::var(key).ok()?.parse().ok()
}

fn parse_bool_env(key: &str) -> Option<bool> {
    let val = env::var(key).ok()?;
    Some(val == "1" || val.eq_ignore_ascii_case("true"))
}

fn parse_path_env(key: &str) -> Option<PathBuf> {
    env::var(key).ok().map(PathBuf::from)
}

fn parse_sizes_env(key: &str) -> Option<SizeDistribution> {
    match env::var(key).ok()?.to_ascii_lowercase().as_str() {
        "equal" => Some(SizeDistribution::Equal),
        "normal" => Some(SizeDistribution::Normal),
        _ => None,
    }
}

fn parse_noise_env(key: &str, max_scale: f64) -> Option<Vec<NoiseKind>> {
    let raw = env::var(key).ok()?;
    let kinds: Vec<NoiseKind> = raw
        .split(',')
        .filter_map(|name| parse_noise_kind(name.trim(), max_scale))
        .collect();
    if kinds.is_empty() {
        None
    } else {
        Some(kinds)
    }
}

/// Parse a noise family name as used in `NR_NOISE`.
pub fn parse_noise_kind(name: &str, max_scale: f64) -> Option<NoiseKind> {
    match name.to_ascii_lowercase().as_str() {
        "identity" | "none" => Some(NoiseKind::Identity),
        "bernoulli" | "uniform" => Some(NoiseKind::BernoulliShift),
        "laplace" => Some(NoiseKind::Laplace { max_scale }),
        "calibrated" | "sigmoid" => Some(NoiseKind::Calibrated {
            schedule: ScaleSchedule::Sigmoid,
        }),
        "calibrated-fixed" | "fixed" => Some(NoiseKind::Calibrated {
            schedule: ScaleSchedule::Fixed,
        }),
        _ => None,
    }
}
