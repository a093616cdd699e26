//! Output formatting and persistence for experiment reports.

mod json;
mod rows;
mod terminal;

use std::path::Path;

use crate::error::Result;
use crate::report::ExperimentReport;

pub use json::{to_json, to_json_pretty, write_report};
pub use rows::{
    grid_file_name, read_series, series_file_name, write_percentages, write_series, write_trial_table,
    SeriesKind,
};
pub use terminal::format_report;

/// File name of the JSON report inside an output directory.
pub const REPORT_FILE: &str = "report.json";

/// Write every artifact of `report` into `dir`.
///
/// - `grid.txt`: sweep parameters, one per line
/// - `<kind>_<rank>_deviation.txt`, `<kind>_<rank>_iterations.txt`,
///   `<kind>_<rank>_axis.txt` for every completed combination
/// - `<kind>_<rank>_samples.txt` (row per trial) when samples were kept
/// - `report.json`
///
/// # Errors
///
/// [`Error::Io`](crate::Error::Io) or [`Error::Json`](crate::Error::Json).
pub fn write_all(report: &ExperimentReport, dir: &Path) -> Result<()> {
    rows::write_rows(report, dir)?;
    write_report(report, &dir.join(REPORT_FILE))?;
    tracing::info!(dir = %dir.display(), "wrote experiment output");
    Ok(())
}
