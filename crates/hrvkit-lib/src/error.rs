use std::path::PathBuf;
use thiserror::Error;

/// Malformed beat record that reached the metric engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("beat {index}: time is not a finite number ({value})")]
    NonFiniteTime { index: usize, value: f64 },

    #[error("beat {index}: type code is missing")]
    MissingType { index: usize },

    #[error("interval after beat {index} is not a finite number of milliseconds")]
    NonFiniteInterval { index: usize },

    #[error("{statistic} is not finite; timestamps are out of range")]
    NonFiniteStatistic { statistic: &'static str },
}

impl DataError {
    /// Name of the offending input column.
    pub fn field(&self) -> &'static str {
        match self {
            DataError::MissingType { .. } => "type",
            DataError::NonFiniteTime { .. }
            | DataError::NonFiniteInterval { .. }
            | DataError::NonFiniteStatistic { .. } => "time",
        }
    }

    /// Position of the offending beat, when the failure is tied to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            DataError::NonFiniteTime { index, .. }
            | DataError::MissingType { index }
            | DataError::NonFiniteInterval { index } => Some(*index),
            DataError::NonFiniteStatistic { .. } => None,
        }
    }
}

/// Failure to obtain a subject's beat sequence from a source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{} does not exist or is not a file", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no {column} column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// Why a single subject in a batch produced an all-null row.
#[derive(Debug, Error)]
pub enum SubjectError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
