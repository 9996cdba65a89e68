//! CLI entry point for the ride funnel report.
//!
//! Loads the five funnel tables from a data directory, computes the selected
//! report sections and prints them to stdout. Logs go to stderr and to a
//! rolling JSON log file.

use anyhow::Result;
use clap::{CommandFactory, Parser, error::ErrorKind};
use ride_funnel::{
    config::RunConfig,
    loader::load_all,
    output::{print_pretty, write_funnel_csv, write_json},
    report::{Section, build_report, expand_sections, render_text},
};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ride_funnel")]
#[command(about = "Funnel metrics for a ride-hailing app from CSV exports", long_about = None)]
struct Cli {
    /// Run the warm-up questions
    #[arg(long)]
    warmup: bool,

    /// Run the full report, or only the named sections
    #[arg(long, value_name = "SECTION", num_args = 0.., value_delimiter = ',')]
    report: Option<Vec<String>>,

    /// Directory holding the CSV files (default: $RIDE_FUNNEL_DATA_DIR or ./Daten)
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Also write the computed report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Also write the funnel steps as CSV
    #[arg(long, value_name = "PATH")]
    funnel_csv: Option<PathBuf>,
}

impl Cli {
    fn sections(&self) -> Result<Vec<Section>, String> {
        let mut sections = match &self.report {
            Some(names) => expand_sections(names)?,
            None => Vec::new(),
        };
        if self.warmup && !sections.contains(&Section::Warmup) {
            sections.push(Section::Warmup);
            sections.sort();
        }
        Ok(sections)
    }
}

fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    let log_dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = log_file
        .file_name()
        .unwrap_or(OsStr::new("ride_funnel.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let sections = match cli.sections() {
        Ok(s) if s.is_empty() => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "select a mode: --warmup or --report [SECTION...]",
            )
            .exit(),
        Ok(s) => s,
        Err(msg) => Cli::command().error(ErrorKind::InvalidValue, msg).exit(),
    };

    let config = RunConfig::from_env(cli.data_dir.clone());
    let _file_guard = init_logging(&config.log_file)?;

    info!(
        data_dir = %config.data_dir.display(),
        sections = ?sections,
        "Starting ride funnel report"
    );

    let data = load_all(&config.data_dir).inspect_err(|e| error!(error = %e, "Loading failed"))?;
    let report = build_report(&data, &sections);
    print_pretty(&report);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render_text(&report, &mut out)?;
    out.flush()?;

    if let Some(path) = &cli.json {
        write_json(path, &report)?;
    }
    if let Some(path) = &cli.funnel_csv {
        match &report.funnel {
            Some(funnel) => write_funnel_csv(path, funnel)?,
            None => warn!(
                path = %path.display(),
                "Funnel section not selected; skipping funnel CSV"
            ),
        }
    }

    Ok(())
}
