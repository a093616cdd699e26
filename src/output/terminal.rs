//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::report::{CombinationReport, ExperimentReport};

/// Format a report for human-readable terminal output.
///
/// One block per combination: reference value, deviation and iteration
/// counts at the first, middle and last grid points, and abandoned searches.
pub fn format_report(report: &ExperimentReport) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("noisy-rank\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!(
        "  Partitions: {} ({} values in [{}, {}])\n",
        report.partitions.partitions,
        report.partitions.total,
        report.partitions.min,
        report.partitions.max
    ));
    output.push_str(&format!(
        "  Sweep: {} grid points x {} trials, seed {:#x}\n",
        report.config.resolution, report.config.trials, report.config.seed
    ));
    match report.config.max_iterations {
        Some(cap) => output.push_str(&format!("  Iteration ceiling: {}\n", cap)),
        None => output.push_str("  Iteration ceiling: none\n"),
    }
    output.push('\n');

    for combination in &report.combinations {
        format_combination(&mut output, combination);
    }

    output.push_str(&sep);
    output.push('\n');
    let failed = report.failures().count();
    if failed > 0 {
        output.push_str(&format!(
            "{}\n",
            format!("{} of {} combinations failed", failed, report.combinations.len())
                .red()
                .bold()
        ));
    }
    output.push_str(&format!("Runtime: {:.2}s\n", report.runtime_secs));
    output
}

fn format_combination(output: &mut String, combination: &CombinationReport) {
    output.push_str(&format!(
        "  {} / {} (k = {})\n",
        combination.noise.to_string().bold(),
        combination.rank,
        combination.k
    ));

    if let Some(err) = &combination.error {
        output.push_str(&format!("    {} {}\n\n", "\u{2717}".red().bold(), err));
        return;
    }
    if let Some(reference) = combination.reference {
        output.push_str(&format!("    Reference: {}\n", reference));
    }

    let points = &combination.points;
    if !points.is_empty() {
        output.push_str("    noise      mean |dev|   p90 |dev|   iterations\n");
        let mut shown = vec![0, points.len() / 2, points.len() - 1];
        shown.dedup();
        for i in shown {
            let p = &points[i];
            output.push_str(&format!(
                "    {:<10.3} {:>11} {:>11.1} {:>12.2}\n",
                p.axis_value,
                colorize_deviation(p.mean_abs_deviation),
                p.p90_deviation,
                p.mean_iterations
            ));
        }
    }

    let abandoned = combination.abandoned();
    if abandoned > 0 {
        output.push_str(&format!(
            "    {}\n",
            format!("\u{26A0} {} searches hit the iteration ceiling", abandoned).yellow()
        ));
    }
    output.push('\n');
}

fn colorize_deviation(deviation: f64) -> String {
    let text = format!("{:.3}", deviation);
    if deviation == 0.0 {
        text.green().to_string()
    } else if deviation < 1.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::noise::NoiseKind;
    use crate::reference::RankTarget;
    use crate::report::{GridPoint, PartitionSummary};

    fn point(parameter: f64, deviation: f64) -> GridPoint {
        GridPoint {
            parameter,
            axis_value: parameter,
            mean_abs_deviation: deviation,
            deviation_std: 0.0,
            p90_deviation: deviation,
            max_deviation: deviation,
            mean_iterations: 7.0,
            abandoned: 0,
            estimates: None,
            noise_draws: None,
        }
    }

    fn report() -> ExperimentReport {
        ExperimentReport {
            config: Config::default(),
            partitions: PartitionSummary {
                partitions: 3,
                total: 300,
                min: 1,
                max: 100,
            },
            combinations: vec![
                CombinationReport {
                    noise: NoiseKind::BernoulliShift,
                    rank: RankTarget::Min,
                    k: 1,
                    reference: Some(1),
                    points: vec![point(0.0, 0.0), point(0.5, 0.4), point(1.0, 1.2)],
                    error: None,
                },
                CombinationReport {
                    noise: NoiseKind::Identity,
                    rank: RankTarget::Rank(999),
                    k: 999,
                    reference: None,
                    points: Vec::new(),
                    error: Some("rank 999 out of range".into()),
                },
            ],
            runtime_secs: 1.25,
        }
    }

    #[test]
    fn test_format_report_mentions_every_combination() {
        colored::control::set_override(false);
        let text = format_report(&report());
        assert!(text.starts_with("noisy-rank\n"));
        assert!(text.contains("bernoulli / min (k = 1)"));
        assert!(text.contains("Reference: 1"));
        assert!(text.contains("identity / k999"));
        assert!(text.contains("rank 999 out of range"));
        assert!(text.contains("1 of 2 combinations failed"));
        assert!(text.contains("Runtime: 1.25s"));
    }
}
