//! End-to-end search scenarios on three parties of 100 values each.

mod common;

use noisy_rank::statistics::trial_rng;
use noisy_rank::{
    count_pair, kth_element, CountPair, NoiseKind, NoiseModel, PartitionSet, SearchAggregator,
    SearchState,
};

/// Upper bound on exact-search rounds for the generated value span.
fn round_bound(set: &PartitionSet) -> usize {
    let span = (set.max() - set.min()) as f64 + 1.0;
    span.log2().ceil() as usize + 1
}

#[test]
fn exact_search_hits_min_median_max() {
    common::init_tracing();
    let set = common::three_parties();
    assert_eq!(set.len(), 3);
    assert_eq!(set.total(), 300);

    for (k, expected) in [
        (1, set.min()),
        (150, kth_element(&set, 150).unwrap()),
        (300, set.max()),
    ] {
        let agg = SearchAggregator::new(&set, k).unwrap();
        let result = agg.search(0.0, &mut trial_rng(1, 0, 0, k)).unwrap();
        assert_eq!(result.estimate, expected, "k = {}", k);
        assert_eq!(result.deviation(expected), 0);
        assert_eq!(result.state, SearchState::Converged);
        assert!(
            result.iterations <= round_bound(&set),
            "k = {} took {} rounds",
            k,
            result.iterations
        );
    }
}

#[test]
fn exact_search_is_correct_for_every_rank() {
    let set = common::three_parties();
    for k in 1..=set.total() {
        let agg = SearchAggregator::new(&set, k).unwrap();
        let result = agg.search(0.0, &mut trial_rng(0, 0, 0, 0)).unwrap();
        assert_eq!(result.estimate, kth_element(&set, k).unwrap(), "k = {}", k);
    }
}

#[test]
fn exact_counts_are_conserved_and_monotone() {
    let set = common::three_parties();
    let mut prev: Option<(usize, usize)> = None;
    for m in (set.min() - 2)..=(set.max() + 2) {
        let (mut less, mut greater, mut equal) = (0, 0, 0);
        for partition in &set {
            let c = count_pair(partition, m);
            less += c.less;
            greater += c.greater;
            equal += partition.values().iter().filter(|&&x| x == m).count();
        }
        assert_eq!(less + greater + equal, set.total(), "m = {}", m);
        if let Some((pl, pg)) = prev {
            assert!(less >= pl && greater <= pg, "m = {}", m);
        }
        prev = Some((less, greater));
    }
}

#[test]
fn bernoulli_full_probability_is_observable() {
    common::init_tracing();
    let set = common::three_parties();

    // The noisy counts must differ from the exact ones in some round.
    let agg = SearchAggregator::new(&set, 150).unwrap();
    let model = NoiseModel::BernoulliShift {
        shift_probability: 1.0,
    };
    let mut perturbed_rounds = 0;
    for trial in 0..20 {
        let (_, rounds) = agg
            .search_traced(&model, &mut trial_rng(3, 0, 0, trial))
            .unwrap();
        for round in rounds {
            let exact = set
                .iter()
                .map(|p| count_pair(p, round.pivot))
                .fold(CountPair::default(), |acc, c| acc + c);
            if exact != round.counts {
                perturbed_rounds += 1;
            }
        }
    }
    assert!(perturbed_rounds > 0, "p = 1 never changed a count");

    // And it must show up in the estimates across ranks.
    let mut total_deviation = 0u64;
    for k in [1, 150, 300] {
        let reference = kth_element(&set, k).unwrap();
        let agg = SearchAggregator::new(&set, k)
            .unwrap()
            .noise(NoiseKind::BernoulliShift)
            .max_iterations(Some(10_000));
        for trial in 0..200 {
            let result = agg.search(1.0, &mut trial_rng(4, k, 0, trial)).unwrap();
            total_deviation += result.deviation(reference);
        }
    }
    assert!(total_deviation > 0, "600 noisy searches all landed exactly");
}

#[test]
fn laplace_max_scale_deviates_more_than_zero_scale() {
    let set = common::three_parties();
    let k = 150;
    let reference = kth_element(&set, k).unwrap();
    let agg = SearchAggregator::new(&set, k)
        .unwrap()
        .noise(NoiseKind::Laplace { max_scale: 2.0 })
        .max_iterations(Some(10_000));

    let mean_deviation = |parameter: f64| {
        let trials = 200;
        let sum: u64 = (0..trials)
            .map(|t| {
                agg.search(parameter, &mut trial_rng(5, 0, 0, t))
                    .unwrap()
                    .deviation(reference)
            })
            .sum();
        sum as f64 / trials as f64
    };

    let quiet = mean_deviation(0.0);
    let loud = mean_deviation(1.0);
    assert_eq!(quiet, 0.0);
    assert!(loud > quiet, "scale 2 mean deviation {} not above scale 0", loud);
}
