use std::path::PathBuf;

use bandgap_core::TensorError;
use thiserror::Error;

/// Errors raised while reading tables or (de)serializing artifacts.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} has no data rows")]
    EmptyTable(PathBuf),

    #[error("row {row} has {len} cells, column {column} requested")]
    ShortRow { row: usize, len: usize, column: usize },

    #[error("row {row}, column {column}: cannot parse {value:?} as a number")]
    NotNumeric {
        row: usize,
        column: usize,
        value: String,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type IoResult<T> = Result<T, IoError>;
