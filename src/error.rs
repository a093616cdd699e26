//! Error types for search and experiment operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building partitions, searching, or running experiments.
#[derive(Error, Debug)]
pub enum Error {
    /// A partition has no elements, so its min/max and counts are undefined.
    #[error("partition {index} is empty")]
    EmptyPartition {
        /// Position of the offending partition.
        index: usize,
    },

    /// No partitions were supplied.
    #[error("at least one partition is required")]
    NoPartitions,

    /// The target rank lies outside `[1, total]`.
    #[error("rank {k} is outside [1, {total}]")]
    RankOutOfRange {
        /// Requested rank.
        k: usize,
        /// Total number of elements across all partitions.
        total: usize,
    },

    /// A noise parameter is outside its admissible range.
    #[error("invalid noise parameter {name} = {value}")]
    InvalidNoiseParameter {
        /// Parameter name (`shift_probability`, `laplace_scale`, ...).
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Experiment configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing an output artifact failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Report serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
