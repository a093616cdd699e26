//! Partitions: the private integer collections held by each party.
//!
//! A [`Partition`] is immutable after construction and stored sorted, so
//! below/above counts can be answered with two binary searches. A
//! [`PartitionSet`] bundles the partitions of one experiment together with
//! the global bounds and total element count the search needs.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One party's private collection of integers.
///
/// Cloning is cheap: the values live behind an `Arc` and are shared
/// read-only between concurrent trials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    values: Arc<[i64]>,
}

impl Partition {
    /// Build a partition from raw values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPartition`] if `values` is empty.
    pub fn new(values: Vec<i64>) -> Result<Self> {
        Self::with_index(0, values)
    }

    pub(crate) fn with_index(index: usize, mut values: Vec<i64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyPartition { index });
        }
        values.sort_unstable();
        Ok(Self {
            values: values.into(),
        })
    }

    /// Sorted view of the values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed partition; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest element.
    pub fn min(&self) -> i64 {
        self.values[0]
    }

    /// Largest element.
    pub fn max(&self) -> i64 {
        self.values[self.values.len() - 1]
    }
}

/// All partitions taking part in one search or experiment.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    partitions: Vec<Partition>,
    min: i64,
    max: i64,
    total: usize,
}

impl PartitionSet {
    /// Validate and wrap raw partitions.
    ///
    /// Partitions may differ in size; the total element count is the true
    /// sum of all sizes.
    ///
    /// # Errors
    ///
    /// [`Error::NoPartitions`] for an empty input and
    /// [`Error::EmptyPartition`] for any empty member.
    pub fn new(raw: Vec<Vec<i64>>) -> Result<Self> {
        let partitions = raw
            .into_iter()
            .enumerate()
            .map(|(index, values)| Partition::with_index(index, values))
            .collect::<Result<Vec<_>>>()?;
        Self::from_partitions(partitions)
    }

    /// Wrap already constructed partitions.
    pub fn from_partitions(partitions: Vec<Partition>) -> Result<Self> {
        let min = partitions
            .iter()
            .map(Partition::min)
            .min()
            .ok_or(Error::NoPartitions)?;
        let max = partitions
            .iter()
            .map(Partition::max)
            .max()
            .ok_or(Error::NoPartitions)?;
        let total = partitions.iter().map(Partition::len).sum();
        Ok(Self {
            partitions,
            min,
            max,
            total,
        })
    }

    /// Deterministically sample partitions from `seed`.
    pub fn generate(spec: &GenerationSpec, seed: u64) -> Result<Self> {
        spec.validate()?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let sizes = spec.sizes.sample_sizes(spec.partitions, spec.partition_size, &mut rng)?;
        let raw = sizes
            .into_iter()
            .map(|size| {
                (0..size)
                    .map(|_| rng.random_range(spec.min_value..=spec.max_value))
                    .collect()
            })
            .collect();
        let set = Self::new(raw)?;
        tracing::debug!(
            partitions = set.len(),
            total = set.total(),
            min = set.min(),
            max = set.max(),
            "generated partitions"
        );
        Ok(set)
    }

    /// The partitions, in party order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Global minimum across all partitions.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Global maximum across all partitions.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Total element count N.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Iterate over the partitions.
    pub fn iter(&self) -> std::slice::Iter<'_, Partition> {
        self.partitions.iter()
    }
}

impl<'a> IntoIterator for &'a PartitionSet {
    type Item = &'a Partition;
    type IntoIter = std::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// How partition sizes are chosen during generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeDistribution {
    /// Every partition gets exactly `partition_size` elements.
    #[default]
    Equal,
    /// Sizes are drawn from a normal distribution around `partition_size`
    /// (standard deviation a quarter of the mean), each at least 1, summing
    /// to `partitions * partition_size`.
    Normal,
}

impl SizeDistribution {
    fn sample_sizes<R: Rng>(
        self,
        partitions: usize,
        partition_size: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        match self {
            SizeDistribution::Equal => Ok(vec![partition_size; partitions]),
            SizeDistribution::Normal => {
                let total = partitions * partition_size;
                let mean = partition_size as f64;
                let normal = Normal::new(mean, mean / 4.0)
                    .map_err(|e| Error::InvalidConfig(format!("size distribution: {e}")))?;

                let mut sizes = vec![1usize; partitions];
                let mut remaining = total - partitions;
                for size in sizes.iter_mut() {
                    let draw = normal.sample(rng).clamp(0.0, remaining as f64) as usize;
                    *size += draw;
                    remaining -= draw;
                }
                if remaining > 0 {
                    let idx = rng.random_range(0..partitions);
                    sizes[idx] += remaining;
                }
                Ok(sizes)
            }
        }
    }
}

/// Parameters for deterministic partition generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSpec {
    /// Number of partitions (parties).
    pub partitions: usize,
    /// Elements per partition (mean size for [`SizeDistribution::Normal`]).
    pub partition_size: usize,
    /// Smallest value that may be drawn (inclusive).
    pub min_value: i64,
    /// Largest value that may be drawn (inclusive).
    pub max_value: i64,
    /// Partition size policy.
    pub sizes: SizeDistribution,
}

impl Default for GenerationSpec {
    fn default() -> Self {
        Self {
            partitions: 3,
            partition_size: 100,
            min_value: 1,
            max_value: 100,
            sizes: SizeDistribution::Equal,
        }
    }
}

impl GenerationSpec {
    fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(Error::NoPartitions);
        }
        if self.partition_size == 0 {
            return Err(Error::InvalidConfig("partition_size must be positive".into()));
        }
        if self.min_value > self.max_value {
            return Err(Error::InvalidConfig(format!(
                "value range [{}, {}] is empty",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}
