//! One report pipeline: pick sections, run their calculators, render text.

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use tracing::{info, warn};

use crate::loader::{Datasets, TableOverview};
use crate::merge::{FunnelTable, merge_funnel};
use crate::metrics::types::{
    AgeGroupRow, DropoffDiagnostics, DurationQuality, FunnelSteps, HourCount, LabelCount,
    PatienceMetrics, PhaseTiming, PlatformRow, TimelineAnomalies, WarmupStats,
};
use crate::metrics::{
    age_breakdown, demand::peak_hour, dropoff_diagnostics, duration_quality, funnel_steps,
    hourly_demand, patience_metrics, platform_breakdown, timeline_anomalies, warmup_stats,
};
use crate::records::UNKNOWN_PLATFORM;

const RULE: &str = "======================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Overview,
    Warmup,
    Quality,
    Timeline,
    Funnel,
    Patience,
    Dropoff,
    Platform,
    Age,
    Demand,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::Overview,
        Section::Warmup,
        Section::Quality,
        Section::Timeline,
        Section::Funnel,
        Section::Patience,
        Section::Dropoff,
        Section::Platform,
        Section::Age,
        Section::Demand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Warmup => "warmup",
            Section::Quality => "quality",
            Section::Timeline => "timeline",
            Section::Funnel => "funnel",
            Section::Patience => "patience",
            Section::Dropoff => "dropoff",
            Section::Platform => "platform",
            Section::Age => "age",
            Section::Demand => "demand",
        }
    }

    fn needs_merge(self) -> bool {
        matches!(self, Section::Funnel | Section::Platform | Section::Age)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a section name. `all` is handled by [`expand_sections`].
impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Section::ALL
            .into_iter()
            .find(|sec| sec.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Section::ALL.iter().map(|s| s.name()).collect();
                format!("unknown section '{s}', expected one of: all, {}", names.join(", "))
            })
    }
}

/// Turns user-supplied names into sections in canonical order without
/// duplicates. Empty input or `all` selects every section.
pub fn expand_sections<S: AsRef<str>>(names: &[S]) -> Result<Vec<Section>, String> {
    if names.is_empty() || names.iter().any(|n| n.as_ref().trim().eq_ignore_ascii_case("all")) {
        return Ok(Section::ALL.to_vec());
    }

    let mut sections = names
        .iter()
        .map(|n| n.as_ref().parse())
        .collect::<Result<Vec<Section>, _>>()?;
    sections.sort();
    sections.dedup();
    Ok(sections)
}

/// Computed results for the selected sections. Unselected sections are `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub data_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Vec<TableOverview>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup: Option<WarmupStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<DurationQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<TimelineAnomalies>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel: Option<FunnelSteps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patience: Option<PatienceMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropoff: Option<DropoffDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Vec<PlatformRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Vec<AgeGroupRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demand: Option<Vec<HourCount>>,
}

/// Runs the calculators for `sections` over already-loaded data.
///
/// The funnel table is merged at most once, and only when a selected section
/// reads it.
#[tracing::instrument(skip(data), fields(data_dir = %data.data_dir.display()))]
pub fn build_report(data: &Datasets, sections: &[Section]) -> Report {
    let rides = &data.ride_requests.rows;
    let funnel: Option<FunnelTable> = sections
        .iter()
        .any(|s| s.needs_merge())
        .then(|| merge_funnel(data));

    let mut report = Report {
        data_dir: data.data_dir.display().to_string(),
        ..Default::default()
    };

    for section in sections {
        match section {
            Section::Overview => report.overview = Some(data.overview()),
            Section::Warmup => report.warmup = Some(warmup_stats(data)),
            Section::Quality => report.quality = Some(duration_quality(rides)),
            Section::Timeline => report.timeline = Some(timeline_anomalies(&data.ride_requests)),
            Section::Patience => report.patience = Some(patience_metrics(rides)),
            Section::Dropoff => report.dropoff = Some(dropoff_diagnostics(rides)),
            Section::Demand => report.demand = Some(hourly_demand(rides)),
            Section::Funnel => report.funnel = funnel.as_ref().map(funnel_steps),
            Section::Platform => report.platform = funnel.as_ref().map(platform_breakdown),
            Section::Age => report.age = funnel.as_ref().map(age_breakdown),
        }
    }

    log_findings(&report);
    info!(sections = sections.len(), "Report computed");
    report
}

/// Surfaces data-quality findings in the log.
fn log_findings(report: &Report) {
    if let Some(q) = &report.quality {
        if q.negative_rides > 0 || q.long_rides > 0 {
            warn!(
                negative_rides = q.negative_rides,
                long_rides = q.long_rides,
                "Implausible ride durations"
            );
        }
    }

    if let Some(t) = &report.timeline {
        if t.total() > 0 {
            warn!(
                accept_before_request = t.accept_before_request,
                cancel_before_request = t.cancel_before_request,
                pickup_before_accept = t.pickup_before_accept,
                dropoff_before_pickup = t.dropoff_before_pickup,
                cancel_after_dropoff = t.cancel_after_dropoff,
                dropoff_without_accept = t.dropoff_without_accept,
                malformed_timestamps = t.malformed_timestamps,
                "Ride timestamps out of order"
            );
        }
    }

    if let Some(f) = &report.funnel {
        for inc in f.increases() {
            warn!(
                from = %inc.from,
                to = %inc.to,
                from_count = inc.from_count,
                to_count = inc.to_count,
                "Funnel count increases between stages"
            );
        }
    }

    if let Some(rows) = &report.platform {
        if let Some(unknown) = rows.iter().find(|r| r.platform == UNKNOWN_PLATFORM) {
            warn!(downloads = unknown.downloads, "Downloads without a platform");
        }
    }

    if let Some(w) = &report.warmup {
        if w.signup_to_request.dropoff_pct.is_nan() {
            warn!("No signups; signup drop-off rate is undefined");
        }
    }
}

/// Writes the report as console text.
pub fn render_text<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    if let Some(tables) = &report.overview {
        header(out, "TABLE OVERVIEW")?;
        for t in tables {
            writeln!(out, "Table: {}", t.file_name)?;
            writeln!(out, " - Rows:    {}", t.rows)?;
            writeln!(out, " - Columns: {}", t.columns.len())?;
            writeln!(out, " - Names:   {}", t.columns.join(", "))?;
        }
    }

    if let Some(w) = &report.warmup {
        render_warmup(w, out)?;
    }

    if let Some(q) = &report.quality {
        header(out, "DATA QUALITY: RIDE DURATION (minutes)")?;
        let s = &q.summary;
        writeln!(out, "count  {}", s.count)?;
        writeln!(out, "mean   {:.2}", s.mean)?;
        writeln!(out, "std    {:.2}", s.std)?;
        writeln!(out, "min    {:.2}", s.min)?;
        writeln!(out, "25%    {:.2}", s.q25)?;
        writeln!(out, "50%    {:.2}", s.median)?;
        writeln!(out, "75%    {:.2}", s.q75)?;
        writeln!(out, "max    {:.2}", s.max)?;
        writeln!(out, "Rides over 5 hours (300 min): {}", q.long_rides)?;
        writeln!(out, "Rides with negative duration: {}", q.negative_rides)?;
    }

    if let Some(t) = &report.timeline {
        header(out, "DATA QUALITY: RIDE TIMELINE")?;
        writeln!(out, "Accept before request:   {}", t.accept_before_request)?;
        writeln!(out, "Cancel before request:   {}", t.cancel_before_request)?;
        writeln!(out, "Pickup before accept:    {}", t.pickup_before_accept)?;
        writeln!(out, "Dropoff before pickup:   {}", t.dropoff_before_pickup)?;
        writeln!(out, "Cancel after dropoff:    {}", t.cancel_after_dropoff)?;
        writeln!(out, "Dropoff without accept:  {}", t.dropoff_without_accept)?;
        writeln!(out, "Unparseable timestamps:  {}", t.malformed_timestamps)?;
    }

    if let Some(f) = &report.funnel {
        header(out, "FUNNEL (distinct users)")?;
        writeln!(out, "{:<10} {:>8} {:>10} {:>10}", "Stage", "Users", "% initial", "% prev")?;
        for step in &f.steps {
            writeln!(
                out,
                "{:<10} {:>8} {:>10.1} {:>10.1}",
                step.stage.label(),
                step.count,
                step.pct_of_initial,
                step.pct_of_previous
            )?;
        }
        writeln!(
            out,
            "Accepted -> Completed conversion: {:.1}%",
            f.accepted_to_completed_pct()
        )?;
        for inc in f.increases() {
            writeln!(
                out,
                "WARNING: {} ({}) exceeds {} ({})",
                inc.to, inc.to_count, inc.from, inc.from_count
            )?;
        }
    }

    if let Some(p) = &report.patience {
        header(out, "PATIENCE VS REALITY (median minutes)")?;
        render_phase(out, &p.search)?;
        render_phase(out, &p.pickup)?;
    }

    if let Some(d) = &report.dropoff {
        header(out, "WHY RIDES DROP AFTER ACCEPT")?;
        writeln!(out, "Accepted but not completed:        {}", d.accepted_not_completed)?;
        writeln!(
            out,
            "Of those cancelled:                {} ({:.1}%)",
            d.cancelled, d.cancelled_pct
        )?;
        writeln!(
            out,
            "Avg wait for completed rides:      {:.2} min",
            d.avg_wait_completed_minutes
        )?;
        writeln!(
            out,
            "Avg wait before cancelling:        {:.2} min",
            d.avg_wait_before_cancel_minutes
        )?;
        writeln!(
            out,
            "Cancelled after waiting > 10 min:  {} ({:.1}%)",
            d.long_waiters, d.long_waiters_pct
        )?;
        writeln!(out, "Top cancellation hours:")?;
        for h in &d.top_cancel_hours {
            writeln!(out, "   {:02}:00  {}", h.hour, h.count)?;
        }
    }

    if let Some(rows) = &report.platform {
        header(out, "PLATFORM COMPARISON")?;
        writeln!(
            out,
            "{:<10} {:>10} {:>10} {:>12}",
            "Platform", "Downloads", "Completed", "Conversion%"
        )?;
        for r in rows {
            writeln!(
                out,
                "{:<10} {:>10} {:>10} {:>12.2}",
                r.platform, r.downloads, r.completed_rides, r.conversion_pct
            )?;
        }
    }

    if let Some(rows) = &report.age {
        header(out, "AGE GROUPS (distinct users)")?;
        writeln!(
            out,
            "{:<10} {:>8} {:>9} {:>10} {:>8}",
            "Age", "Signups", "Requests", "Completed", "Reviews"
        )?;
        for r in rows {
            writeln!(
                out,
                "{:<10} {:>8} {:>9} {:>10} {:>8}",
                r.age_group, r.signups, r.requests, r.completed, r.reviews
            )?;
        }
    }

    if let Some(demand) = &report.demand {
        header(out, "REQUESTS PER HOUR")?;
        for h in demand {
            writeln!(out, "{:02}:00  {}", h.hour, h.count)?;
        }
        if let Some(peak) = peak_hour(demand) {
            writeln!(out, "Peak hour: {:02}:00 ({} requests)", peak.hour, peak.count)?;
        }
    }

    Ok(())
}

fn render_warmup<W: Write>(w: &WarmupStats, out: &mut W) -> io::Result<()> {
    header(out, "WARM-UP QUESTIONS")?;
    writeln!(out, "1. Number of app downloads: {}", w.downloads)?;
    writeln!(out, "2. Number of signups: {}", w.signups)?;
    writeln!(out, "3. Number of ride requests: {}", w.ride_requests)?;
    writeln!(out, "4. Number of completed rides: {}", w.completed_rides)?;
    writeln!(out, "5. Number of ride requests: {}", w.ride_requests)?;
    writeln!(
        out,
        "   Number of unique users with ride requests: {}",
        w.unique_requesting_users
    )?;
    writeln!(
        out,
        "6. Average ride duration (pickup to dropoff): {:.2} minutes",
        w.avg_ride_duration_minutes
    )?;
    writeln!(out, "7. Number of rides accepted by a driver: {}", w.accepted_rides)?;
    writeln!(out, "8. Number of successfully charged rides: {}", w.approved_charges)?;
    writeln!(out, "   Total revenue: ${:.2}", w.total_revenue_usd)?;
    writeln!(out, "9. Downloads per platform:")?;
    render_labels(out, &w.downloads_per_platform)?;
    writeln!(out, "   Ride requests per platform:")?;
    render_labels(out, &w.requests_per_platform)?;
    writeln!(out, "10. Drop-off from signup to ride request:")?;
    writeln!(out, "    Signups: {}", w.signup_to_request.signups)?;
    writeln!(
        out,
        "    Users with ride requests: {}",
        w.signup_to_request.users_with_request
    )?;
    writeln!(
        out,
        "    Drop-off rate: {:.2}%",
        w.signup_to_request.dropoff_pct
    )?;
    Ok(())
}

fn render_labels<W: Write>(out: &mut W, labels: &[LabelCount]) -> io::Result<()> {
    for l in labels {
        writeln!(out, "   - {}: {}", l.label, l.count)?;
    }
    Ok(())
}

fn render_phase<W: Write>(out: &mut W, p: &PhaseTiming) -> io::Result<()> {
    writeln!(
        out,
        "{:<8} reality {:>8.2} (n={})   patience {:>8.2} (n={})",
        p.phase.label(),
        p.reality_minutes,
        p.reality_samples,
        p.patience_minutes,
        p.patience_samples
    )
}

fn header<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}
