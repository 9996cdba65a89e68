//! Debug logging and on-disk persistence for computed reports.
//!
//! Supports pretty-printing, a JSON report file and a funnel CSV.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use crate::metrics::types::FunnelSteps;
use crate::report::Report;

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &Report) {
    debug!("{:#?}", report);
}

/// Writes the report as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: &Path, report: &Report) -> Result<()> {
    let file = create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("writing JSON report to {}", path.display()))?;
    info!(path = %path.display(), "JSON report written");
    Ok(())
}

#[derive(Serialize)]
struct FunnelCsvRow<'a> {
    stage: &'a str,
    users: usize,
    pct_of_initial: f64,
    pct_of_previous: f64,
}

/// Writes one row per funnel stage with a header line.
pub fn write_funnel_csv(path: &Path, funnel: &FunnelSteps) -> Result<()> {
    let file = create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for step in &funnel.steps {
        writer.serialize(FunnelCsvRow {
            stage: step.stage.label(),
            users: step.count,
            pct_of_initial: step.pct_of_initial,
            pct_of_previous: step.pct_of_previous,
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), stages = funnel.steps.len(), "Funnel CSV written");
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    debug!(path = %path.display(), "Creating output file");
    File::create(path).with_context(|| format!("creating {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{FunnelStage, FunnelStep};
    use tempfile::TempDir;

    fn funnel() -> FunnelSteps {
        FunnelSteps {
            steps: vec![
                FunnelStep {
                    stage: FunnelStage::Downloads,
                    count: 4,
                    pct_of_initial: 100.0,
                    pct_of_previous: 100.0,
                },
                FunnelStep {
                    stage: FunnelStage::Signups,
                    count: 3,
                    pct_of_initial: 75.0,
                    pct_of_previous: 75.0,
                },
            ],
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&Report::default());
    }

    #[test]
    fn test_write_json_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");

        let report = Report {
            funnel: Some(funnel()),
            ..Default::default()
        };
        write_json(&path, &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["funnel"]["steps"][1]["count"], 3);
        assert!(json.get("demand").is_none());
    }

    #[test]
    fn test_write_funnel_csv_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("funnel.csv");

        write_funnel_csv(&path, &funnel()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "stage,users,pct_of_initial,pct_of_previous");
        assert_eq!(lines[2], "Signups,3,75.0,75.0");
    }

    #[test]
    fn test_write_funnel_csv_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("funnel.csv");

        write_funnel_csv(&path, &funnel()).unwrap();
        write_funnel_csv(&path, &funnel()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
