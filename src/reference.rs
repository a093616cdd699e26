//! Ground truth: the exact k-th order statistic of the merged partitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partition::PartitionSet;

/// Exact k-th smallest element (1-indexed) of all partitions merged.
///
/// Used only to score searches, never inside one.
///
/// # Errors
///
/// [`Error::RankOutOfRange`] unless `1 <= k <= N`.
pub fn kth_element(partitions: &PartitionSet, k: usize) -> Result<i64> {
    let total = partitions.total();
    if k == 0 || k > total {
        return Err(Error::RankOutOfRange { k, total });
    }
    let mut merged: Vec<i64> = partitions
        .iter()
        .flat_map(|p| p.values().iter().copied())
        .collect();
    merged.sort_unstable();
    Ok(merged[k - 1])
}

/// A rank expressed relative to the total element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankTarget {
    /// `k = 1`.
    Min,
    /// `k = max(N / 2, 1)`.
    Median,
    /// `k = N`.
    Max,
    /// A fixed rank.
    Rank(usize),
}

impl RankTarget {
    /// The conventional sweep targets: min, median, max.
    pub const STANDARD: [RankTarget; 3] = [RankTarget::Min, RankTarget::Median, RankTarget::Max];

    /// Resolve to a concrete `k` for `total` elements.
    pub fn resolve(self, total: usize) -> usize {
        match self {
            RankTarget::Min => 1,
            RankTarget::Median => (total / 2).max(1),
            RankTarget::Max => total,
            RankTarget::Rank(k) => k,
        }
    }
}

impl fmt::Display for RankTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankTarget::Min => write!(f, "min"),
            RankTarget::Median => write!(f, "median"),
            RankTarget::Max => write!(f, "max"),
            RankTarget::Rank(k) => write!(f, "k{}", k),
        }
    }
}
