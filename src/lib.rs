//! # noisy-rank
//!
//! Estimate the k-th smallest element across several private partitions by
//! binary search over noisy counts.
//!
//! Each party answers only "how many of my values are below / above this
//! pivot?", and answers with noise. An aggregator sums the answers and
//! narrows the value range until it accepts a pivot. This crate provides:
//! - Partition generation and exact counting
//! - Noise models: identity, Bernoulli ±1 shifts, Laplace perturbation, and
//!   level-calibrated Laplace
//! - The noisy search itself, with an optional iteration ceiling
//! - An experiment driver that sweeps the noise parameter and reports how far
//!   estimates drift from the exact answer, and how many rounds they take
//!
//! ## Quick Start
//!
//! ```ignore
//! use noisy_rank::{NoiseKind, PartitionSet, SearchAggregator};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let parties = PartitionSet::new(vec![vec![3, 9, 14], vec![1, 7], vec![5, 12]])?;
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
//!
//! let result = SearchAggregator::new(&parties, 4)?
//!     .noise(NoiseKind::BernoulliShift)
//!     .search(0.25, &mut rng)?;
//!
//! println!("estimate {} after {} rounds", result.estimate, result.iterations);
//! ```
//!
//! ## Sweeps
//!
//! ```ignore
//! use noisy_rank::Experiment;
//!
//! let report = Experiment::quick().seed(7).output_dir("results").run()?;
//! print!("{}", noisy_rank::output::format_report(&report));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod error;
mod experiment;
mod report;

// Functional modules
pub mod counting;
pub mod noise;
pub mod output;
pub mod partition;
pub mod reference;
pub mod search;
pub mod statistics;
pub mod thread_pool;

// Re-exports for public API
pub use config::{parse_noise_kind, Config, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED};
pub use counting::{count_pair, count_slice, CountPair};
pub use error::{Error, Result};
pub use experiment::{estimate_kth, search_once, Experiment};
pub use noise::{CountContext, NoiseKind, NoiseLevel, NoiseModel, Perturbation, ScaleSchedule};
pub use partition::{GenerationSpec, Partition, PartitionSet, SizeDistribution};
pub use reference::{kth_element, RankTarget};
pub use report::{CombinationReport, ExperimentReport, GridPoint, PartitionSummary, TrialRecord};
pub use search::{decide, Decision, GlobalRange, Round, SearchAggregator, SearchResult, SearchState};
