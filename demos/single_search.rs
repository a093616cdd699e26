//! One search, traced round by round, followed by a batch of trials written
//! as a deviation-percentage column for a histogram.
//!
//! ```text
//! RUST_LOG=debug cargo run --example single_search -- laplace 0.5
//! ```

use std::env;
use std::path::Path;

use noisy_rank::output::{write_percentages, write_trial_table};
use noisy_rank::statistics::trial_rng;
use noisy_rank::{parse_noise_kind, Config, Experiment, NoiseKind, RankTarget, SearchAggregator};

fn main() -> noisy_rank::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = env::args().skip(1);
    let noise = args
        .next()
        .and_then(|name| parse_noise_kind(&name, 2.0))
        .unwrap_or(NoiseKind::BernoulliShift);
    let parameter: f64 = args.next().and_then(|p| p.parse().ok()).unwrap_or(0.5);

    let experiment = Experiment::with_config(Config::from_env()).trials(1_000);
    let partitions = experiment.generate_partitions()?;
    let k = RankTarget::Median.resolve(partitions.total());

    let model = noise.model(parameter)?;
    let aggregator = SearchAggregator::new(&partitions, k)?
        .max_iterations(experiment.config().max_iterations);
    let mut rng = trial_rng(experiment.config().seed, 0, 0, 0);
    let (result, rounds) = aggregator.search_traced(&model, &mut rng)?;

    println!("{} at {} for k = {} of {}", noise, parameter, k, partitions.total());
    for (i, round) in rounds.iter().enumerate() {
        println!(
            "  round {:>3}: [{}, {}] pivot {:>4}  L = {:>4}  G = {:>4}  {:?}",
            i + 1,
            round.range.low,
            round.range.high,
            round.pivot,
            round.counts.less,
            round.counts.greater,
            round.decision
        );
    }
    println!("estimate {} ({:?})", result.estimate, result.state);

    let records = experiment.trial_records(&partitions, noise, RankTarget::Median, parameter)?;
    let Some(reference) = records.first().map(|r| r.reference) else {
        return Ok(());
    };
    let estimates: Vec<i64> = records.iter().map(|r| r.result.estimate).collect();
    let iterations: Vec<usize> = records.iter().map(|r| r.result.iterations).collect();

    let dir = experiment
        .config()
        .output_dir
        .clone()
        .unwrap_or_else(|| Path::new("results").to_path_buf());
    std::fs::create_dir_all(&dir).map_err(|source| noisy_rank::Error::Io {
        path: dir.clone(),
        source,
    })?;
    write_percentages(&dir.join("single_deviation_pct.txt"), &estimates, reference)?;
    let iterations: Vec<i64> = iterations.into_iter().map(|i| i as i64).collect();
    write_trial_table(&dir.join("single_trials.txt"), &[estimates, iterations])?;
    println!("reference {}; wrote {} trials to {}", reference, records.len(), dir.display());
    Ok(())
}
