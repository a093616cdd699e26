//! Main `Experiment` entry point and builder.

use std::path::PathBuf;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::error::Result;
use crate::noise::{NoiseKind, NoiseModel};
use crate::output;
use crate::partition::{PartitionSet, SizeDistribution};
use crate::reference::{kth_element, RankTarget};
use crate::report::{CombinationReport, ExperimentReport, GridPoint, PartitionSummary, TrialRecord};
use crate::search::{SearchAggregator, SearchResult, SearchState};
use crate::statistics::{percentile, trial_rng, RunningStats};
use crate::thread_pool;

/// Sweeps noise parameters over repeated searches and measures how far the
/// estimates drift from the exact k-th element.
///
/// # Example
///
/// ```ignore
/// use noisy_rank::{Experiment, NoiseKind, RankTarget};
///
/// let report = Experiment::quick()
///     .noise_kinds(vec![NoiseKind::BernoulliShift])
///     .ranks(vec![RankTarget::Median])
///     .seed(7)
///     .run()?;
///
/// for combo in &report.combinations {
///     println!("{}: {:?}", combo.stem(), combo.deviation_series());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Experiment {
    config: Config,
}

impl Default for Experiment {
    fn default() -> Self {
        Self::new()
    }
}

/// How independent searches are scheduled. Reports do not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Execution {
    Sequential,
    #[cfg(feature = "parallel")]
    Parallel,
}

impl Execution {
    /// Parallel when the feature is on and the pool has more than one thread.
    fn preferred() -> Self {
        #[cfg(feature = "parallel")]
        {
            let threads = thread_pool::get_thread_pool()
                .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads());
            if threads > 1 {
                Execution::Parallel
            } else {
                Execution::Sequential
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            Execution::Sequential
        }
    }
}

/// One (noise family, rank) cell of the sweep.
#[derive(Debug, Clone, Copy)]
struct Combination {
    index: usize,
    noise: NoiseKind,
    rank: RankTarget,
}

impl Experiment {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Create with a small configuration for tests and smoke runs.
    ///
    /// Settings:
    /// - 50 trials per grid point (vs 1,000 default)
    /// - 11 grid points (vs 100 default)
    pub fn quick() -> Self {
        Self {
            config: Config {
                trials: 50,
                resolution: 11,
                ..Config::default()
            },
        }
    }

    /// Create with the full sweep: three parties of 100 values in `[1, 100]`,
    /// 1,000 trials at each of 100 grid points, Laplace up to scale 2, for the
    /// minimum, median and maximum.
    pub fn paper() -> Self {
        Self {
            config: Config {
                noise_kinds: vec![
                    NoiseKind::Identity,
                    NoiseKind::BernoulliShift,
                    NoiseKind::Laplace { max_scale: 2.0 },
                ],
                ..Config::default()
            },
        }
    }

    /// Create with defaults overridden from `NR_*` environment variables.
    ///
    /// See [`Config::merge_env`] for the recognised variables.
    pub fn from_env() -> Self {
        Self {
            config: Config::from_env(),
        }
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the number of searches per grid point.
    pub fn trials(mut self, n: usize) -> Self {
        self.config.trials = n;
        self
    }

    /// Set the number of grid points in `[0, 1]`.
    pub fn resolution(mut self, n: usize) -> Self {
        self.config.resolution = n;
        self
    }

    /// Set the number of generated partitions.
    pub fn partitions(mut self, n: usize) -> Self {
        self.config.generation.partitions = n;
        self
    }

    /// Set the (mean) number of values per generated partition.
    pub fn partition_size(mut self, n: usize) -> Self {
        self.config.generation.partition_size = n;
        self
    }

    /// Set the inclusive value range for generated partitions.
    pub fn value_range(mut self, min: i64, max: i64) -> Self {
        self.config.generation.min_value = min;
        self.config.generation.max_value = max;
        self
    }

    /// Set how generated partition sizes are distributed.
    pub fn sizes(mut self, sizes: SizeDistribution) -> Self {
        self.config.generation.sizes = sizes;
        self
    }

    /// Set the ranks to estimate.
    pub fn ranks(mut self, ranks: Vec<RankTarget>) -> Self {
        self.config.ranks = ranks;
        self
    }

    /// Set the noise families to sweep.
    pub fn noise_kinds(mut self, kinds: Vec<NoiseKind>) -> Self {
        self.config.noise_kinds = kinds;
        self
    }

    /// Set the per-search iteration ceiling; `None` searches without bound.
    pub fn max_iterations(mut self, n: Option<usize>) -> Self {
        self.config.max_iterations = n;
        self
    }

    /// Keep every trial's estimate in the report.
    pub fn keep_samples(mut self, keep: bool) -> Self {
        self.config.keep_samples = keep;
        self
    }

    /// Keep every raw noise draw in the report and write the draws of the
    /// noisiest grid point to `<stem>_noise.txt`.
    pub fn keep_noise(mut self, keep: bool) -> Self {
        self.config.keep_noise = keep;
        self
    }

    /// Write row files and the JSON report under `dir` after each run.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate the partitions this experiment would run on.
    ///
    /// # Errors
    ///
    /// `Error::InvalidConfig` if the generation settings are unusable.
    pub fn generate_partitions(&self) -> Result<PartitionSet> {
        PartitionSet::generate(&self.config.generation, self.config.seed)
    }

    /// Generate partitions and run the sweep over them.
    ///
    /// # Errors
    ///
    /// Configuration and generation errors, and I/O errors when an output
    /// directory is set. Failures inside one combination are recorded on
    /// that combination instead.
    pub fn run(&self) -> Result<ExperimentReport> {
        let partitions = self.generate_partitions()?;
        self.run_on(&partitions)
    }

    /// Run the sweep over caller-supplied partitions.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run), minus generation errors.
    pub fn run_on(&self, partitions: &PartitionSet) -> Result<ExperimentReport> {
        self.run_with(partitions, Execution::preferred())
    }

    fn run_with(&self, partitions: &PartitionSet, execution: Execution) -> Result<ExperimentReport> {
        self.config.validate()?;
        let start = Instant::now();

        let combinations: Vec<Combination> = self
            .config
            .noise_kinds
            .iter()
            .flat_map(|&noise| self.config.ranks.iter().map(move |&rank| (noise, rank)))
            .enumerate()
            .map(|(index, (noise, rank))| Combination { index, noise, rank })
            .collect();

        tracing::info!(
            combinations = combinations.len(),
            partitions = partitions.len(),
            total = partitions.total(),
            trials = self.config.trials,
            resolution = self.config.resolution,
            "starting experiment"
        );

        let grid = self.config.grid();
        let reports = thread_pool::install(|| {
            map_ordered(execution, &combinations, |combo| {
                self.run_combination(partitions, &grid, combo, execution)
            })
        });

        let report = ExperimentReport {
            config: self.config.clone(),
            partitions: PartitionSummary {
                partitions: partitions.len(),
                total: partitions.total(),
                min: partitions.min(),
                max: partitions.max(),
            },
            combinations: reports,
            runtime_secs: start.elapsed().as_secs_f64(),
        };

        if let Some(dir) = &self.config.output_dir {
            output::write_all(&report, dir)?;
        }
        Ok(report)
    }

    /// Run `trials` searches for one rank at one noise parameter and return
    /// every outcome, for scatter plots and histograms.
    ///
    /// Trial `t` uses the same RNG stream as trial `t` of the first grid
    /// point of the first combination in [`run_on`](Self::run_on).
    ///
    /// # Errors
    ///
    /// `Error::RankOutOfRange` or `Error::InvalidNoiseParameter`.
    pub fn trial_records(
        &self,
        partitions: &PartitionSet,
        noise: NoiseKind,
        rank: RankTarget,
        parameter: f64,
    ) -> Result<Vec<TrialRecord>> {
        let k = rank.resolve(partitions.total());
        let reference = kth_element(partitions, k)?;
        let model = noise.model(parameter)?;
        let aggregator =
            SearchAggregator::new(partitions, k)?.max_iterations(self.config.max_iterations);
        let trials: Vec<usize> = (0..self.config.trials).collect();
        thread_pool::install(|| {
            map_ordered(Execution::preferred(), &trials, |&trial| -> Result<TrialRecord> {
                let mut rng = trial_rng(self.config.seed, 0, 0, trial);
                Ok(TrialRecord {
                    k,
                    noise,
                    parameter,
                    trial,
                    result: aggregator.search_with(&model, &mut rng)?,
                    reference,
                })
            })
        })
        .into_iter()
        .collect()
    }

    fn run_combination(
        &self,
        partitions: &PartitionSet,
        grid: &[f64],
        combo: &Combination,
        execution: Execution,
    ) -> CombinationReport {
        let k = combo.rank.resolve(partitions.total());
        let mut report = CombinationReport {
            noise: combo.noise,
            rank: combo.rank,
            k,
            reference: None,
            points: Vec::with_capacity(grid.len()),
            error: None,
        };

        match self.sweep(partitions, grid, combo, k, execution) {
            Ok((reference, points)) => {
                tracing::info!(
                    noise = combo.noise.label(),
                    rank = %combo.rank,
                    k,
                    reference,
                    "combination complete"
                );
                report.reference = Some(reference);
                report.points = points;
            }
            Err(err) => {
                tracing::warn!(
                    noise = combo.noise.label(),
                    rank = %combo.rank,
                    %err,
                    "combination failed"
                );
                report.error = Some(err.to_string());
            }
        }
        report
    }

    fn sweep(
        &self,
        partitions: &PartitionSet,
        grid: &[f64],
        combo: &Combination,
        k: usize,
        execution: Execution,
    ) -> Result<(i64, Vec<GridPoint>)> {
        let reference = kth_element(partitions, k)?;
        let aggregator = SearchAggregator::new(partitions, k)?
            .noise(combo.noise)
            .max_iterations(self.config.max_iterations);

        let mut points = Vec::with_capacity(grid.len());
        for (grid_index, &parameter) in grid.iter().enumerate() {
            let model = combo.noise.model(parameter)?;
            let trials: Vec<usize> = (0..self.config.trials).collect();
            let outcomes = map_ordered(execution, &trials, |&trial| {
                let mut rng = trial_rng(self.config.seed, combo.index, grid_index, trial);
                if self.config.keep_noise {
                    aggregator.search_recorded(&model, &mut rng)
                } else {
                    Ok((aggregator.search_with(&model, &mut rng)?, Vec::new()))
                }
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
            let (results, draws): (Vec<SearchResult>, Vec<Vec<f64>>) = outcomes.into_iter().unzip();
            let mut point = self.summarize(combo.noise, parameter, reference, &results);
            if self.config.keep_noise {
                point.noise_draws = Some(draws.concat());
            }
            points.push(point);
        }
        Ok((reference, points))
    }

    fn summarize(
        &self,
        noise: NoiseKind,
        parameter: f64,
        reference: i64,
        results: &[SearchResult],
    ) -> GridPoint {
        let mut deviations: Vec<f64> = results
            .iter()
            .map(|r| r.deviation(reference) as f64)
            .collect();
        let deviation_stats: RunningStats = deviations.iter().copied().collect();
        let iteration_stats: RunningStats = results.iter().map(|r| r.iterations as f64).collect();

        GridPoint {
            parameter,
            axis_value: noise.axis_value(parameter),
            mean_abs_deviation: deviation_stats.mean(),
            deviation_std: deviation_stats.std_dev(),
            p90_deviation: percentile(&mut deviations, 0.9).unwrap_or(0.0),
            max_deviation: deviation_stats.max(),
            mean_iterations: iteration_stats.mean(),
            abandoned: results
                .iter()
                .filter(|r| r.state == SearchState::Abandoned)
                .count(),
            estimates: self
                .config
                .keep_samples
                .then(|| results.iter().map(|r| r.estimate).collect()),
            noise_draws: None,
        }
    }
}

/// Estimate the `k`-th element once, with noise family `kind` at sweep
/// parameter `parameter` and a seeded RNG.
///
/// Convenience wrapper around [`SearchAggregator`] for one-off searches.
///
/// # Errors
///
/// `Error::RankOutOfRange` or `Error::InvalidNoiseParameter`.
pub fn estimate_kth(
    partitions: &PartitionSet,
    k: usize,
    kind: NoiseKind,
    parameter: f64,
    seed: u64,
) -> Result<SearchResult> {
    let aggregator = SearchAggregator::new(partitions, k)?.noise(kind);
    let mut rng = trial_rng(seed, 0, 0, 0);
    aggregator.search(parameter, &mut rng)
}

/// Run one search with an explicit model and seed, without an iteration
/// ceiling unless `max_iterations` is set.
///
/// # Errors
///
/// `Error::RankOutOfRange` or an invalid model.
pub fn search_once(
    partitions: &PartitionSet,
    k: usize,
    model: &NoiseModel,
    max_iterations: Option<usize>,
    seed: u64,
) -> Result<SearchResult> {
    let aggregator = SearchAggregator::new(partitions, k)?.max_iterations(max_iterations);
    let mut rng = trial_rng(seed, 0, 0, 0);
    aggregator.search_with(model, &mut rng)
}

/// Order-preserving map over independent items.
#[cfg(feature = "parallel")]
fn map_ordered<T, U, F>(execution: Execution, items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    match execution {
        Execution::Sequential => items.iter().map(f).collect(),
        Execution::Parallel => items.par_iter().map(f).collect(),
    }
}

#[cfg(not(feature = "parallel"))]
fn map_ordered<T, U, F>(execution: Execution, items: &[T], f: F) -> Vec<U>
where
    F: Fn(&T) -> U,
{
    match execution {
        Execution::Sequential => items.iter().map(f).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn tiny() -> Experiment {
        Experiment::quick().trials(8).resolution(3).partition_size(20)
    }

    #[test]
    fn test_builder_sets_config() {
        let exp = Experiment::new()
            .seed(9)
            .trials(12)
            .resolution(4)
            .partitions(5)
            .value_range(-10, 10)
            .max_iterations(None)
            .keep_samples(true)
            .keep_noise(true);
        let c = exp.config();
        assert_eq!(c.seed, 9);
        assert_eq!(c.trials, 12);
        assert_eq!(c.resolution, 4);
        assert_eq!(c.generation.partitions, 5);
        assert_eq!((c.generation.min_value, c.generation.max_value), (-10, 10));
        assert_eq!(c.max_iterations, None);
        assert!(c.keep_samples);
        assert!(c.keep_noise);
    }

    #[test]
    fn test_report_shape() {
        let report = tiny().run().unwrap();
        let kinds = report.config.noise_kinds.len();
        let ranks = report.config.ranks.len();
        assert_eq!(report.combinations.len(), kinds * ranks);
        for combo in &report.combinations {
            assert!(combo.is_ok(), "{}: {:?}", combo.stem(), combo.error);
            assert_eq!(combo.points.len(), 3);
            assert!(combo.points.iter().all(|p| p.estimates.is_none()));
        }
        assert_eq!(report.partitions.total, 60);
    }

    #[test]
    fn test_zero_parameter_is_exact() {
        let report = tiny().run().unwrap();
        for combo in &report.combinations {
            let first = &combo.points[0];
            assert_eq!(first.parameter, 0.0);
            assert_eq!(first.mean_abs_deviation, 0.0, "{}", combo.stem());
            assert_eq!(first.abandoned, 0);
        }
    }

    #[test]
    fn test_keep_samples() {
        let report = tiny().keep_samples(true).run().unwrap();
        let point = &report.combinations[0].points[1];
        assert_eq!(point.estimates.as_ref().map(Vec::len), Some(8));
    }

    #[test]
    fn test_invalid_config_fails_whole_run() {
        let err = tiny().resolution(1).run().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_rank_fails_only_its_combination() {
        let report = tiny()
            .noise_kinds(vec![NoiseKind::Identity])
            .ranks(vec![RankTarget::Median, RankTarget::Rank(10_000)])
            .run()
            .unwrap();
        assert!(report.combinations[0].is_ok());
        let failed = &report.combinations[1];
        assert!(failed.error.is_some());
        assert!(failed.points.is_empty());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_trial_records() {
        let exp = tiny().trials(20);
        let set = exp.generate_partitions().unwrap();
        let records = exp
            .trial_records(&set, NoiseKind::BernoulliShift, RankTarget::Median, 1.0)
            .unwrap();
        assert_eq!(records.len(), 20);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.trial, i);
            assert_eq!(record.k, 30);
            assert_eq!(record.deviation(), record.result.deviation(record.reference));
        }
    }

    #[test]
    fn test_estimate_kth_exact() {
        let set = PartitionSet::new(vec![vec![1, 5, 9], vec![2, 6], vec![3, 7, 8]]).unwrap();
        let result = estimate_kth(&set, 4, NoiseKind::Identity, 0.0, 1).unwrap();
        assert_eq!(result.estimate, 5);
        assert!(result.converged());
    }

    #[test]
    fn test_search_once_rejects_invalid_model() {
        let set = PartitionSet::new(vec![vec![1, 2, 3]]).unwrap();
        let model = NoiseModel::BernoulliShift {
            shift_probability: 1.5,
        };
        assert!(search_once(&set, 1, &model, None, 0).is_err());
    }

    #[test]
    fn test_execution_modes_agree() {
        let exp = tiny().keep_samples(true).keep_noise(true);
        let set = exp.generate_partitions().unwrap();
        let sequential = exp.run_with(&set, Execution::Sequential).unwrap();
        let preferred = exp.run_with(&set, Execution::preferred()).unwrap();
        assert_eq!(sequential.combinations, preferred.combinations);
        #[cfg(feature = "parallel")]
        {
            let parallel = exp.run_with(&set, Execution::Parallel).unwrap();
            assert_eq!(sequential.combinations, parallel.combinations);
        }
    }

    #[test]
    fn test_keep_noise_collects_every_draw() {
        let report = tiny()
            .noise_kinds(vec![NoiseKind::Laplace { max_scale: 2.0 }])
            .ranks(vec![RankTarget::Median])
            .keep_noise(true)
            .run()
            .unwrap();
        let combo = &report.combinations[0];
        let partitions = report.partitions.partitions;
        for point in &combo.points {
            let draws = point.noise_draws.as_ref().unwrap();
            let rounds = point.mean_iterations * 8.0;
            // One shared draw per partition per round.
            assert!((draws.len() as f64 - rounds * partitions as f64).abs() < 1e-6);
        }
        // Scale zero draws nothing but zeros.
        assert!(combo.points[0].noise_draws.as_ref().unwrap().iter().all(|&d| d == 0.0));
        assert!(combo.last_noise_draws().unwrap().iter().any(|&d| d != 0.0));
    }

    #[test]
    fn test_noise_draws_omitted_by_default() {
        let report = tiny().run().unwrap();
        assert!(report
            .combinations
            .iter()
            .flat_map(|c| &c.points)
            .all(|p| p.noise_draws.is_none()));
    }
}
