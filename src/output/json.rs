//! JSON serialization for experiment reports.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};
use crate::report::ExperimentReport;

/// Serialize a report to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// ExperimentReport).
pub fn to_json(report: &ExperimentReport) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize a report to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// ExperimentReport).
pub fn to_json_pretty(report: &ExperimentReport) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Write a pretty-printed report to `path`, creating parent directories.
///
/// # Errors
///
/// [`Error::Io`] on filesystem failures, [`Error::Json`] if serialization
/// fails.
pub fn write_report(report: &ExperimentReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}
