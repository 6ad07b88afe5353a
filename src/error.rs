// Error taxonomy: measurement failures are recovered, persistence failures are surfaced

use std::path::PathBuf;
use thiserror::Error;

use crate::models::{Command, MonitorState};

/// A measurement cycle failed; recorded as an error sample, never fatal.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("no reachable speed test server")]
    NoServer,
    #[error("speed test request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("host metrics unavailable: {0}")]
    HostMetrics(String),
    #[error("measurement task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Writing the series file failed. Reported to the operator, not retried.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        command: Command,
        state: MonitorState,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
