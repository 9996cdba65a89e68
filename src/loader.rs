//! Loads and validates the five funnel CSV files from a data directory.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::records::{AppDownload, Review, RideRequest, Signup, Transaction, is_malformed_timestamp};
use crate::schema::{
    APP_DOWNLOADS, REVIEWS, RIDE_REQUESTS, SIGNUPS, TRANSACTIONS, TableSchema,
    ensure_required_columns, schema_for,
};

/// One validated input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    pub file_name: String,
    pub path: PathBuf,
    /// Header names in file order, including columns beyond the required set.
    pub columns: Vec<String>,
    pub rows: Vec<T>,
    /// Non-empty `*_ts` cells that could not be parsed and were read as null.
    pub malformed_timestamps: usize,
}

impl<T> Table<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Shape summary of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOverview {
    pub file_name: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

impl<T> From<&Table<T>> for TableOverview {
    fn from(t: &Table<T>) -> Self {
        TableOverview {
            file_name: t.file_name.clone(),
            rows: t.rows.len(),
            columns: t.columns.clone(),
        }
    }
}

/// All five tables of a run. Loaded once and passed down by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub data_dir: PathBuf,
    pub app_downloads: Table<AppDownload>,
    pub signups: Table<Signup>,
    pub ride_requests: Table<RideRequest>,
    pub transactions: Table<Transaction>,
    pub reviews: Table<Review>,
}

impl Datasets {
    /// Overview of every table in load order.
    pub fn overview(&self) -> Vec<TableOverview> {
        vec![
            (&self.app_downloads).into(),
            (&self.signups).into(),
            (&self.ride_requests).into(),
            (&self.transactions).into(),
            (&self.reviews).into(),
        ]
    }
}

/// Expands a leading `~` and makes the path absolute.
///
/// Existing paths are canonicalized so error messages show the real location.
pub fn resolve_data_dir(data_dir: &Path) -> PathBuf {
    let expanded = expand_home(data_dir, std::env::var_os("HOME").as_deref());

    if let Ok(canonical) = expanded.canonicalize() {
        return canonical;
    }

    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Replaces a leading `~` component with `home`. `~user` forms and paths
/// without a leading `~` are returned unchanged, as is everything when no
/// home directory is known.
fn expand_home(path: &Path, home: Option<&OsStr>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Loads all five files from `data_dir`.
///
/// # Errors
///
/// Fails on the first missing directory, missing file, unreadable CSV, or
/// missing required column. No partial result is returned.
#[tracing::instrument(skip_all, fields(data_dir = %data_dir.display()))]
pub fn load_all(data_dir: &Path) -> Result<Datasets, LoadError> {
    let dir = resolve_data_dir(data_dir);
    if !dir.is_dir() {
        return Err(LoadError::DataDirNotFound { path: dir });
    }

    info!(dir = %dir.display(), "Loading funnel tables");

    let datasets = Datasets {
        app_downloads: load_named(&dir, APP_DOWNLOADS)?,
        signups: load_named(&dir, SIGNUPS)?,
        ride_requests: load_named(&dir, RIDE_REQUESTS)?,
        transactions: load_named(&dir, TRANSACTIONS)?,
        reviews: load_named(&dir, REVIEWS)?,
        data_dir: dir,
    };

    info!(
        downloads = datasets.app_downloads.len(),
        signups = datasets.signups.len(),
        ride_requests = datasets.ride_requests.len(),
        transactions = datasets.transactions.len(),
        reviews = datasets.reviews.len(),
        "Tables loaded"
    );

    Ok(datasets)
}

fn load_named<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Result<Table<T>, LoadError> {
    let schema = schema_for(file_name).ok_or_else(|| LoadError::FileNotFound {
        path: dir.join(file_name),
    })?;
    load_table(&dir.join(file_name), schema)
}

/// Reads one CSV file, validates its header against `schema` and
/// deserializes every row.
pub fn load_table<T: DeserializeOwned>(
    path: &Path,
    schema: &TableSchema,
) -> Result<Table<T>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().from_reader(file);

    let headers = reader.headers().map_err(csv_err)?.clone();
    ensure_required_columns(headers.iter(), schema.required, schema.file_name)?;

    let ts_columns: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| name.ends_with("_ts"))
        .map(|(i, _)| i)
        .collect();

    let mut rows = Vec::new();
    let mut malformed_timestamps = 0;

    for result in reader.records() {
        let record = result.map_err(csv_err)?;

        malformed_timestamps += ts_columns
            .iter()
            .filter(|&&i| record.get(i).is_some_and(is_malformed_timestamp))
            .count();

        let row: T = record.deserialize(Some(&headers)).map_err(csv_err)?;
        rows.push(row);
    }

    if malformed_timestamps > 0 {
        warn!(
            file = schema.file_name,
            malformed_timestamps, "Unparseable timestamps read as null"
        );
    }
    debug!(file = schema.file_name, rows = rows.len(), "Table loaded");

    Ok(Table {
        file_name: schema.file_name.to_string(),
        path: path.to_path_buf(),
        columns: headers.iter().map(str::to_string).collect(),
        rows,
        malformed_timestamps,
    })
}
