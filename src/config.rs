//! Run configuration resolved from CLI flags, environment and defaults.
//!
//! A `.env` file, when present, is loaded into the environment by the binary
//! before this module reads it.

use std::path::PathBuf;

/// Overrides the data directory when no `--data-dir` flag is given.
pub const DATA_DIR_ENV: &str = "RIDE_FUNNEL_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "Daten";

pub const LOG_FILE_ENV: &str = "LOG_FILE_PATH";
pub const DEFAULT_LOG_FILE: &str = "logs/ride_funnel.log";

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl RunConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env(cli_data_dir: Option<PathBuf>) -> Self {
        Self::resolve(
            cli_data_dir,
            std::env::var(DATA_DIR_ENV).ok(),
            std::env::var(LOG_FILE_ENV).ok(),
        )
    }

    /// Flag beats environment beats default. Blank environment values are
    /// ignored.
    pub fn resolve(
        cli_data_dir: Option<PathBuf>,
        env_data_dir: Option<String>,
        env_log_file: Option<String>,
    ) -> Self {
        let data_dir = cli_data_dir
            .or_else(|| non_blank(env_data_dir).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let log_file = non_blank(env_log_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        RunConfig { data_dir, log_file }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
