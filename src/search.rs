//! Noisy binary search for the k-th smallest element across partitions.
//!
//! Each round the aggregator picks the pivot `m = floor((a + b) / 2)`,
//! collects one perturbed [`CountPair`] per partition, sums them into
//! `(L, G)` and applies the decision rule:
//!
//! 1. `L < k && G <= N - k`: accept `m`.
//! 2. `L >= k`: search below, `b = m - 1`.
//! 3. otherwise: search above, `a = m + 1`.
//!
//! With exact counts the rule is the classic binary-search invariant and
//! converges in `O(log(b - a))` rounds. Noisy counts can send the interval
//! the wrong way, and nothing bounds recovery, so a search may also be
//! abandoned after a configurable iteration ceiling.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::counting::{count_pair, CountPair};
use crate::error::{Error, Result};
use crate::noise::{CountContext, NoiseKind, NoiseModel, Perturbation};
use crate::partition::{Partition, PartitionSet};

/// Closed search interval `[low, high]`.
///
/// May become inverted (`low > high`) under noise; the pivot is still
/// well defined in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRange {
    /// Lower bound `a`.
    pub low: i64,
    /// Upper bound `b`.
    pub high: i64,
}

impl GlobalRange {
    /// `floor((low + high) / 2)`, overflow-free.
    pub fn pivot(&self) -> i64 {
        ((self.low as i128 + self.high as i128).div_euclid(2)) as i64
    }
}

/// Where a search stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    /// Still narrowing the interval.
    Searching,
    /// The decision rule accepted a pivot.
    Converged,
    /// The iteration ceiling was hit first.
    Abandoned,
}

/// Outcome of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Accepted pivot, or the best candidate seen if abandoned.
    pub estimate: i64,
    /// Rounds executed.
    pub iterations: usize,
    /// [`SearchState::Converged`] or [`SearchState::Abandoned`].
    pub state: SearchState,
}

impl SearchResult {
    /// Whether the decision rule accepted the estimate.
    pub fn converged(&self) -> bool {
        self.state == SearchState::Converged
    }

    /// Absolute difference from `reference`.
    pub fn deviation(&self, reference: i64) -> u64 {
        self.estimate.abs_diff(reference)
    }
}

/// What happened in a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Pivot accepted.
    Accept,
    /// `b = m - 1`.
    SearchBelow,
    /// `a = m + 1`.
    SearchAbove,
}

/// Record of one round, returned by [`SearchAggregator::search_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Interval at the start of the round.
    pub range: GlobalRange,
    /// Pivot queried.
    pub pivot: i64,
    /// Aggregated (noisy) counts.
    pub counts: CountPair,
    /// Decision taken.
    pub decision: Decision,
}

/// Runs the noisy binary search for rank `k` over a [`PartitionSet`].
///
/// The aggregator only reads the partitions. Every call to
/// [`search`](Self::search) starts from the full `[min, max]` interval, so
/// one aggregator can serve many independent trials.
#[derive(Debug, Clone)]
pub struct SearchAggregator<'a> {
    partitions: &'a PartitionSet,
    k: usize,
    kind: NoiseKind,
    max_iterations: Option<usize>,
}

impl<'a> SearchAggregator<'a> {
    /// Create an aggregator for rank `k` (1-indexed).
    ///
    /// Defaults to [`NoiseKind::Identity`] and no iteration ceiling.
    ///
    /// # Errors
    ///
    /// [`Error::RankOutOfRange`] unless `1 <= k <= N`.
    pub fn new(partitions: &'a PartitionSet, k: usize) -> Result<Self> {
        let total = partitions.total();
        if k == 0 || k > total {
            return Err(Error::RankOutOfRange { k, total });
        }
        Ok(Self {
            partitions,
            k,
            kind: NoiseKind::Identity,
            max_iterations: None,
        })
    }

    /// Set the noise family used by [`search`](Self::search).
    pub fn noise(mut self, kind: NoiseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Abandon a search after `n` rounds; `None` searches without bound.
    pub fn max_iterations(mut self, n: Option<usize>) -> Self {
        self.max_iterations = n;
        self
    }

    /// Target rank.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total element count N.
    pub fn total(&self) -> usize {
        self.partitions.total()
    }

    /// Run one search with the configured noise family at `noise_parameter`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNoiseParameter`] if the parameter is invalid for the
    /// configured family.
    pub fn search<R: Rng + ?Sized>(&self, noise_parameter: f64, rng: &mut R) -> Result<SearchResult> {
        let model = self.kind.model(noise_parameter)?;
        Ok(self.run(&model, rng, None, None))
    }

    /// Run one search with an explicit perturbation.
    ///
    /// # Errors
    ///
    /// Whatever [`Perturbation::validate`] rejects, before any round runs.
    pub fn search_with<P: Perturbation, R: Rng + ?Sized>(
        &self,
        model: &P,
        rng: &mut R,
    ) -> Result<SearchResult> {
        model.validate()?;
        Ok(self.run(model, rng, None, None))
    }

    /// Run one search and return the round-by-round trace alongside the result.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNoiseParameter`] if `model` is invalid.
    pub fn search_traced<R: Rng + ?Sized>(
        &self,
        model: &NoiseModel,
        rng: &mut R,
    ) -> Result<(SearchResult, Vec<Round>)> {
        model.validate()?;
        let mut rounds = Vec::new();
        let result = self.run(model, rng, Some(&mut rounds), None);
        Ok((result, rounds))
    }

    /// Run one search and return every raw noise draw it consumed, in order.
    ///
    /// # Errors
    ///
    /// Whatever [`Perturbation::validate`] rejects.
    pub fn search_recorded<P: Perturbation, R: Rng + ?Sized>(
        &self,
        model: &P,
        rng: &mut R,
    ) -> Result<(SearchResult, Vec<f64>)> {
        model.validate()?;
        let mut draws = Vec::new();
        let result = self.run(model, rng, None, Some(&mut draws));
        Ok((result, draws))
    }

    fn run<P: Perturbation, R: Rng + ?Sized>(
        &self,
        model: &P,
        rng: &mut R,
        mut trace: Option<&mut Vec<Round>>,
        mut draws: Option<&mut Vec<f64>>,
    ) -> SearchResult {
        let k = self.k;
        let n = self.partitions.total();
        let mut range = GlobalRange {
            low: self.partitions.min(),
            high: self.partitions.max(),
        };
        let mut iterations = 0usize;
        let mut best = Candidate::none();

        let mut state = SearchState::Searching;
        while state == SearchState::Searching {
            if self.max_iterations.is_some_and(|cap| iterations >= cap) {
                state = SearchState::Abandoned;
                break;
            }

            let pivot = range.pivot();
            iterations += 1;

            let mut counts = CountPair::default();
            for partition in self.partitions {
                let exact = count_pair(partition, pivot);
                let ctx = self.context(partition, range);
                counts += match draws.as_deref_mut() {
                    Some(draws) => model.perturb_recorded(exact, ctx, rng, draws),
                    None => model.perturb(exact, ctx, rng),
                };
            }

            let decision = decide(counts, k, n);
            if let Some(rounds) = trace.as_deref_mut() {
                rounds.push(Round {
                    range,
                    pivot,
                    counts,
                    decision,
                });
            }

            match decision {
                Decision::Accept => {
                    best = Candidate {
                        pivot,
                        violation: 0,
                    };
                    state = SearchState::Converged;
                }
                Decision::SearchBelow => range.high = pivot.saturating_sub(1),
                Decision::SearchAbove => range.low = pivot.saturating_add(1),
            }
            if state == SearchState::Searching {
                best.offer(pivot, violation(counts, k, n));
            }
        }

        // An abandoned search with zero rounds still needs a candidate.
        let mut estimate = best.pivot_or(range.pivot());
        if state == SearchState::Abandoned {
            estimate = estimate.clamp(self.partitions.min(), self.partitions.max());
        }
        let result = SearchResult {
            estimate,
            iterations,
            state,
        };
        if state == SearchState::Abandoned {
            tracing::warn!(k, iterations, estimate, "search abandoned at iteration ceiling");
        } else {
            tracing::debug!(k, iterations, estimate, "search converged");
        }
        result
    }

    /// Extreme ranks size noise by what is left of the interval; other
    /// ranks by the whole partition.
    fn context(&self, partition: &Partition, range: GlobalRange) -> CountContext {
        let mut ctx = CountContext::whole(partition.len());
        if self.k == 1 || self.k == self.partitions.total() {
            ctx.range_len = range_len(partition.values(), range).max(1);
        }
        ctx
    }
}

/// Elements of sorted `values` inside `[range.low, range.high]`.
fn range_len(values: &[i64], range: GlobalRange) -> usize {
    let start = values.partition_point(|&v| v < range.low);
    let end = values.partition_point(|&v| v <= range.high);
    end.saturating_sub(start)
}

/// Apply the decision rule to aggregated counts.
pub fn decide(counts: CountPair, k: usize, total: usize) -> Decision {
    if counts.less < k && counts.greater <= total - k {
        Decision::Accept
    } else if counts.less >= k {
        Decision::SearchBelow
    } else {
        Decision::SearchAbove
    }
}

/// How far aggregated counts are from accepting the pivot.
fn violation(counts: CountPair, k: usize, total: usize) -> usize {
    counts
        .less
        .saturating_sub(k - 1)
        .saturating_add(counts.greater.saturating_sub(total - k))
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    pivot: i64,
    violation: usize,
}

impl Candidate {
    fn none() -> Self {
        Self {
            pivot: 0,
            violation: usize::MAX,
        }
    }

    /// Keep the least-violating pivot, preferring the latest on ties.
    fn offer(&mut self, pivot: i64, violation: usize) {
        if violation <= self.violation {
            self.pivot = pivot;
            self.violation = violation;
        }
    }

    fn pivot_or(&self, fallback: i64) -> i64 {
        if self.violation == usize::MAX {
            fallback
        } else {
            self.pivot
        }
    }
}
