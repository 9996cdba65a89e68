//! Configuration and input errors raised while loading the datasets.
//!
//! Data-quality findings never travel through this type; they are part of the
//! metric results.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Data directory not found: {}", path.display())]
    DataDirNotFound { path: PathBuf },

    #[error("Required file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// `columns` is sorted so the message is stable across runs.
    #[error("Missing columns in {table}: {columns:?}")]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Failed to parse CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
