// CSV persistence of a monitoring session

use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::models::Sample;
use crate::series::Series;

/// Fixed column order of the series file.
pub const COLUMNS: [&str; 9] = [
    "timestamp",
    "download",
    "upload",
    "ping",
    "cpu_percent",
    "mem_percent",
    "mem_used",
    "mem_total",
    "cpu_temp",
];

/// Trailing column, present only when at least one sample failed.
pub const ERROR_COLUMN: &str = "error";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// `<directory>/<prefix>_YYYYmmdd_HHMMSS.csv` for a session started at `started_at`.
pub fn session_csv_path(directory: &Path, prefix: &str, started_at: DateTime<Local>) -> PathBuf {
    directory.join(format!(
        "{}_{}.csv",
        prefix,
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Writes the whole series to `path`, replacing any previous file. Returns the data row count.
pub fn write_csv(series: &Series, path: &Path) -> Result<usize, PersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_records(series, file).map_err(|source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Header plus one row per sample, in series order.
pub fn write_records<W: Write>(series: &Series, writer: W) -> Result<usize, csv::Error> {
    let with_error = series.has_errors();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = COLUMNS.to_vec();
    if with_error {
        header.push(ERROR_COLUMN);
    }
    wtr.write_record(&header)?;

    for sample in series {
        wtr.write_record(record(sample, with_error))?;
    }
    wtr.flush()?;
    Ok(series.len())
}

fn record(sample: &Sample, with_error: bool) -> Vec<String> {
    let mut row = vec![
        sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        fixed(sample.download, 2),
        fixed(sample.upload, 2),
        fixed(sample.ping, 2),
        fixed(sample.cpu_percent, 1),
        fixed(sample.mem_percent, 1),
        fixed(sample.mem_used, 2),
        fixed(sample.mem_total, 2),
        fixed(sample.cpu_temp, 1),
    ];
    if with_error {
        row.push(sample.error.clone().unwrap_or_default());
    }
    row
}

fn fixed(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_default()
}
