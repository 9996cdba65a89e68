//! Result types returned by the metric calculators.
//!
//! Rates that have no defined value (zero denominator, no samples) are `NaN`.
//! They serialize to JSON `null`.

use serde::Serialize;
use std::fmt;

/// A label with its row count, e.g. a platform bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Drop-off between signing up and requesting a first ride.
#[derive(Debug, Clone, Serialize)]
pub struct SignupDropoff {
    pub signups: usize,
    pub users_with_request: usize,
    pub dropoff_pct: f64,
}

/// Headline numbers over the raw tables.
#[derive(Debug, Clone, Serialize)]
pub struct WarmupStats {
    pub downloads: usize,
    pub signups: usize,
    pub ride_requests: usize,
    pub completed_rides: usize,
    pub unique_requesting_users: usize,
    pub avg_ride_duration_minutes: f64,
    pub accepted_rides: usize,
    pub approved_charges: usize,
    pub total_revenue_usd: f64,
    pub downloads_per_platform: Vec<LabelCount>,
    pub requests_per_platform: Vec<LabelCount>,
    pub signup_to_request: SignupDropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FunnelStage {
    Downloads,
    Signups,
    Requests,
    Accepted,
    Completed,
    Payment,
    Reviews,
}

impl FunnelStage {
    /// Every stage in funnel order.
    pub const ALL: [FunnelStage; 7] = [
        FunnelStage::Downloads,
        FunnelStage::Signups,
        FunnelStage::Requests,
        FunnelStage::Accepted,
        FunnelStage::Completed,
        FunnelStage::Payment,
        FunnelStage::Reviews,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FunnelStage::Downloads => "Downloads",
            FunnelStage::Signups => "Signups",
            FunnelStage::Requests => "Requests",
            FunnelStage::Accepted => "Accepted",
            FunnelStage::Completed => "Completed",
            FunnelStage::Payment => "Payment",
            FunnelStage::Reviews => "Reviews",
        }
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStep {
    pub stage: FunnelStage,
    pub count: usize,
    pub pct_of_initial: f64,
    pub pct_of_previous: f64,
}

/// A stage whose count exceeds the stage before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageIncrease {
    pub from: FunnelStage,
    pub to: FunnelStage,
    pub from_count: usize,
    pub to_count: usize,
}

/// Distinct users reaching each stage, in funnel order.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelSteps {
    pub steps: Vec<FunnelStep>,
}

impl FunnelSteps {
    pub fn count(&self, stage: FunnelStage) -> usize {
        self.steps
            .iter()
            .find(|s| s.stage == stage)
            .map_or(0, |s| s.count)
    }

    pub fn counts(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.count).collect()
    }

    /// Share of accepted users that also completed a ride.
    pub fn accepted_to_completed_pct(&self) -> f64 {
        super::utility::pct(
            self.count(FunnelStage::Completed),
            self.count(FunnelStage::Accepted),
        )
    }

    /// Consecutive stages where the count went up.
    pub fn increases(&self) -> Vec<StageIncrease> {
        self.steps
            .windows(2)
            .filter_map(|pair| match pair {
                [a, b] if b.count > a.count => Some(StageIncrease {
                    from: a.stage,
                    to: b.stage,
                    from_count: a.count,
                    to_count: b.count,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Descriptive statistics in the shape of a `describe()` summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Pickup-to-dropoff durations with their anomaly counts.
#[derive(Debug, Clone, Serialize)]
pub struct DurationQuality {
    pub summary: SummaryStats,
    pub long_rides: usize,
    pub negative_rides: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Request until a driver accepts.
    Search,
    /// Acceptance until the rider is picked up.
    Pickup,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Search => "search",
            Phase::Pickup => "pickup",
        }
    }
}

/// Median observed wait against median wait of those who gave up.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub reality_minutes: f64,
    pub reality_samples: usize,
    pub patience_minutes: f64,
    pub patience_samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatienceMetrics {
    pub search: PhaseTiming,
    pub pickup: PhaseTiming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// Why accepted rides fail to complete.
#[derive(Debug, Clone, Serialize)]
pub struct DropoffDiagnostics {
    /// Accepted rides with no dropoff.
    pub accepted_not_completed: usize,
    /// Of those, the ones with a cancellation.
    pub cancelled: usize,
    pub cancelled_pct: f64,
    pub avg_wait_completed_minutes: f64,
    pub avg_wait_before_cancel_minutes: f64,
    pub long_waiters: usize,
    pub long_waiters_pct: f64,
    pub top_cancel_hours: Vec<HourCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformRow {
    pub platform: String,
    pub downloads: usize,
    pub completed_rides: usize,
    pub conversion_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupRow {
    pub age_group: String,
    pub signups: usize,
    pub requests: usize,
    pub completed: usize,
    pub reviews: usize,
}

/// Rides whose timestamps break the request/accept/pickup/dropoff order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineAnomalies {
    pub accept_before_request: usize,
    pub cancel_before_request: usize,
    pub pickup_before_accept: usize,
    pub dropoff_before_pickup: usize,
    pub cancel_after_dropoff: usize,
    pub dropoff_without_accept: usize,
    pub malformed_timestamps: usize,
}

impl TimelineAnomalies {
    pub fn total(&self) -> usize {
        self.accept_before_request
            + self.cancel_before_request
            + self.pickup_before_accept
            + self.dropoff_before_pickup
            + self.cancel_after_dropoff
            + self.dropoff_without_accept
            + self.malformed_timestamps
    }
}
