//! Exact below/above counts around a pivot.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partition::Partition;

/// Counts of elements strictly below (`less`) and strictly above (`greater`)
/// a pivot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPair {
    /// Elements `< m`.
    pub less: usize,
    /// Elements `> m`.
    pub greater: usize,
}

impl CountPair {
    /// Create a pair.
    pub fn new(less: usize, greater: usize) -> Self {
        Self { less, greater }
    }
}

/// Saturating: noisy counts can be arbitrarily large.
impl std::ops::Add for CountPair {
    type Output = CountPair;

    fn add(self, rhs: CountPair) -> CountPair {
        CountPair {
            less: self.less.saturating_add(rhs.less),
            greater: self.greater.saturating_add(rhs.greater),
        }
    }
}

impl std::ops::AddAssign for CountPair {
    fn add_assign(&mut self, rhs: CountPair) {
        *self = *self + rhs;
    }
}

/// Exact counts for a partition around `pivot`.
///
/// Partitions are stored sorted, so this is two binary searches.
pub fn count_pair(partition: &Partition, pivot: i64) -> CountPair {
    count_sorted(partition.values(), pivot)
}

/// Exact counts for an arbitrary (unsorted) slice.
///
/// # Errors
///
/// Returns [`Error::EmptyPartition`] if `values` is empty.
pub fn count_slice(values: &[i64], pivot: i64) -> Result<CountPair> {
    if values.is_empty() {
        return Err(Error::EmptyPartition { index: 0 });
    }
    let pair = values.iter().fold(CountPair::default(), |mut acc, &x| {
        match x.cmp(&pivot) {
            std::cmp::Ordering::Less => acc.less += 1,
            std::cmp::Ordering::Greater => acc.greater += 1,
            std::cmp::Ordering::Equal => (),
        }
        acc
    });
    Ok(pair)
}

fn count_sorted(sorted: &[i64], pivot: i64) -> CountPair {
    let less = sorted.partition_point(|&x| x < pivot);
    let not_greater = sorted.partition_point(|&x| x <= pivot);
    CountPair {
        less,
        greater: sorted.len() - not_greater,
    }
}
