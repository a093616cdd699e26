//! Zero-noise settings of every family must reproduce the exact search,
//! invalid models never reach a search, and recorded draws follow their law.

mod common;

use noisy_rank::statistics::trial_rng;
use noisy_rank::{
    kth_element, search_once, Error, NoiseKind, NoiseLevel, NoiseModel, ScaleSchedule,
    SearchAggregator, SearchResult,
};

fn run_all(model: &NoiseModel, k: usize) -> Vec<SearchResult> {
    let set = common::three_parties();
    let agg = SearchAggregator::new(&set, k).unwrap();
    (0..50)
        .map(|t| agg.search_with(model, &mut trial_rng(8, 0, 0, t)).unwrap())
        .collect()
}

#[test]
fn zero_noise_matches_identity() {
    common::init_tracing();
    let zero_models = [
        NoiseModel::BernoulliShift {
            shift_probability: 0.0,
        },
        NoiseModel::Laplace { laplace_scale: 0.0 },
        NoiseModel::Calibrated {
            level: NoiseLevel::None,
            schedule: ScaleSchedule::Sigmoid,
        },
        NoiseModel::Calibrated {
            level: NoiseLevel::None,
            schedule: ScaleSchedule::Fixed,
        },
    ];

    for k in [1, 150, 300] {
        let identity = run_all(&NoiseModel::Identity, k);
        for model in &zero_models {
            let results = run_all(model, k);
            for (a, b) in identity.iter().zip(&results) {
                assert_eq!(a.estimate, b.estimate, "{:?}, k = {}", model, k);
                assert_eq!(a.iterations, b.iterations, "{:?}, k = {}", model, k);
            }
        }
    }
}

#[test]
fn kinds_map_zero_parameter_to_exact_models() {
    for kind in [
        NoiseKind::Identity,
        NoiseKind::BernoulliShift,
        NoiseKind::Laplace { max_scale: 5.0 },
        NoiseKind::Calibrated {
            schedule: ScaleSchedule::Sigmoid,
        },
    ] {
        let model = kind.model(0.0).unwrap();
        assert!(model.is_exact(), "{} at 0 gave {:?}", kind, model);
    }
}

#[test]
fn calibrated_high_noise_stays_bounded() {
    let set = common::three_parties();
    let k = 150;
    let reference = kth_element(&set, k).unwrap();
    let agg = SearchAggregator::new(&set, k)
        .unwrap()
        .noise(NoiseKind::Calibrated {
            schedule: ScaleSchedule::Fixed,
        })
        .max_iterations(Some(500));

    for t in 0..50 {
        let result = agg.search(1.0, &mut trial_rng(9, 0, 0, t)).unwrap();
        assert!(result.iterations <= 500);
        // Estimates are pivots inside (or one step outside) the value range.
        assert!(
            result.estimate >= set.min() - 1 && result.estimate <= set.max() + 1,
            "estimate {} far from reference {}",
            result.estimate,
            reference
        );
    }
}

#[test]
fn invalid_parameters_are_rejected() {
    let set = common::three_parties();
    let agg = SearchAggregator::new(&set, 10)
        .unwrap()
        .noise(NoiseKind::BernoulliShift);
    assert!(agg.search(1.5, &mut trial_rng(0, 0, 0, 0)).is_err());
    assert!(agg.search(-0.1, &mut trial_rng(0, 0, 0, 0)).is_err());

    let bad = NoiseModel::Laplace {
        laplace_scale: f64::NAN,
    };
    assert!(bad.validate().is_err());
}

#[test]
fn explicit_models_are_validated_before_searching() {
    let set = common::three_parties();
    let agg = SearchAggregator::new(&set, 150).unwrap();
    let bernoulli = NoiseModel::BernoulliShift {
        shift_probability: 1.5,
    };
    let laplace = NoiseModel::Laplace {
        laplace_scale: f64::NAN,
    };
    assert!(matches!(
        agg.search_with(&bernoulli, &mut trial_rng(0, 0, 0, 0)),
        Err(Error::InvalidNoiseParameter {
            name: "shift_probability",
            ..
        })
    ));
    assert!(matches!(
        agg.search_with(&laplace, &mut trial_rng(0, 0, 0, 0)),
        Err(Error::InvalidNoiseParameter {
            name: "laplace_scale",
            ..
        })
    ));
    assert!(search_once(&set, 150, &laplace, None, 0).is_err());
}

#[test]
fn recorded_laplace_draws_have_expected_magnitude() {
    // Laplace(0, b) has E|x| = b.
    let set = common::three_parties();
    let agg = SearchAggregator::new(&set, 150)
        .unwrap()
        .max_iterations(Some(1_000));
    let scale = 2.0;
    let model = NoiseModel::Laplace {
        laplace_scale: scale,
    };

    let mut draws = Vec::new();
    for t in 0..500 {
        let (result, trial_draws) = agg.search_recorded(&model, &mut trial_rng(10, 0, 0, t)).unwrap();
        assert_eq!(trial_draws.len(), result.iterations * set.len());
        draws.extend(trial_draws);
    }
    let mean_abs = draws.iter().map(|d| d.abs()).sum::<f64>() / draws.len() as f64;
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    assert!((mean_abs - scale).abs() < 0.1, "E|eps| = {} over {} draws", mean_abs, draws.len());
    assert!(mean.abs() < 0.1, "mean = {}", mean);
}
