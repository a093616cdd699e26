//! Full noise sweep: min, median and max under every configured noise family.
//!
//! Settings come from `NR_*` environment variables (see `Config::merge_env`);
//! output lands in `NR_OUTPUT_DIR`, or `results/` when unset.
//!
//! ```text
//! NR_TRIALS=200 NR_RESOLUTION=21 cargo run --release --example sweep
//! ```

use noisy_rank::{output, Experiment};

fn main() -> noisy_rank::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,noisy_rank::search=error".into()),
        )
        .init();

    let mut experiment = Experiment::from_env();
    if experiment.config().output_dir.is_none() {
        experiment = experiment.output_dir("results");
    }

    let report = experiment.run()?;
    print!("{}", output::format_report(&report));
    Ok(())
}
