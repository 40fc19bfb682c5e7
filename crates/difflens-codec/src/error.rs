//! Codec error types.

use std::path::PathBuf;

use difflens_core::{ComparisonMode, PathError};
use thiserror::Error;

/// Errors reading or writing snapshot tables.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The table path failed validation.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The table could not be opened or created.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table is not well-formed tab-separated text.
    #[error("Malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An expected column is absent from the header.
    #[error("Column '{column}' did not exist in {path}! Was it written under a mode other than {mode}?")]
    MissingColumn {
        path: PathBuf,
        column: String,
        mode: ComparisonMode,
    },

    /// A `size_bytes` cell is not a non-negative integer.
    #[error("Invalid size {value:?} in {path} at line {line}")]
    InvalidSize {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// A multi-file read was given no files.
    #[error("No snapshot files were given")]
    NoInputs,
}

impl CodecError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
