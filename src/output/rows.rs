//! Header-less row files: one value per line, or one trial per line.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::{CombinationReport, ExperimentReport};
use crate::statistics::deviation_percentages;

/// Which per-grid-point series a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Mean absolute deviation.
    Deviation,
    /// Mean iteration count.
    Iterations,
    /// x-axis values.
    Axis,
    /// Raw estimates, one row per trial.
    Samples,
    /// Raw noise draws at the noisiest grid point, one per line.
    Noise,
}

impl SeriesKind {
    fn suffix(self) -> &'static str {
        match self {
            SeriesKind::Deviation => "deviation",
            SeriesKind::Iterations => "iterations",
            SeriesKind::Axis => "axis",
            SeriesKind::Samples => "samples",
            SeriesKind::Noise => "noise",
        }
    }
}

/// `<kind>_<rank>_<series>.txt`
pub fn series_file_name(combination: &CombinationReport, series: SeriesKind) -> String {
    format!("{}_{}.txt", combination.stem(), series.suffix())
}

/// Name of the file holding the sweep grid.
pub fn grid_file_name() -> &'static str {
    "grid.txt"
}

/// Write `values` one per line.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be created or written.
pub fn write_series<T: Display>(path: &Path, values: &[T]) -> Result<()> {
    write_with(path, |out| {
        for value in values {
            writeln!(out, "{}", value)?;
        }
        Ok(())
    })
}

/// Write a row-per-trial table: row `t` holds trial `t`'s value at every
/// grid point, space separated.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be created or written.
pub fn write_trial_table<T: Display>(path: &Path, columns: &[Vec<T>]) -> Result<()> {
    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    write_with(path, |out| {
        for row in 0..rows {
            let mut first = true;
            for column in columns {
                if let Some(value) = column.get(row) {
                    if !first {
                        out.write_all(b" ")?;
                    }
                    write!(out, "{}", value)?;
                    first = false;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    })
}

/// Write each estimate's signed deviation from `reference`, in percent, one
/// per line. Writes an empty file when `reference` is zero.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be created or written.
pub fn write_percentages(path: &Path, estimates: &[i64], reference: i64) -> Result<()> {
    write_series(path, &deviation_percentages(estimates, reference))
}

/// Read back a one-value-per-line file.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be read or a line is not a number.
pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = line
            .parse()
            .map_err(|err| io_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        values.push(value);
    }
    Ok(values)
}

pub(super) fn write_rows(report: &ExperimentReport, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    write_series(&dir.join(grid_file_name()), &report.config.grid())?;

    for combination in report.combinations.iter().filter(|c| c.is_ok()) {
        let path = |series| dir.join(series_file_name(combination, series));
        write_series(&path(SeriesKind::Deviation), &combination.deviation_series())?;
        write_series(&path(SeriesKind::Iterations), &combination.iteration_series())?;
        write_series(&path(SeriesKind::Axis), &combination.axis())?;

        let samples: Vec<Vec<i64>> = combination
            .points
            .iter()
            .filter_map(|p| p.estimates.clone())
            .collect();
        if !samples.is_empty() {
            write_trial_table(&path(SeriesKind::Samples), &samples)?;
        }
        if let Some(draws) = combination.last_noise_draws() {
            write_series(&path(SeriesKind::Noise), draws)?;
        }
    }
    Ok(())
}

fn write_with<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let wrap = |source| Error::Io {
        path: PathBuf::from(path),
        source,
    };
    let file = File::create(path).map_err(wrap)?;
    let mut out = BufWriter::new(file);
    body(&mut out).map_err(wrap)?;
    out.flush().map_err(wrap)
}
