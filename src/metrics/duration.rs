//! Ride duration distribution and its outliers.

use super::types::{DurationQuality, SummaryStats};
use super::utility::{mean, quantile, span_minutes, stddev};
use crate::records::RideRequest;

/// Rides longer than this many minutes are flagged.
pub const LONG_RIDE_MINUTES: f64 = 300.0;

/// Pickup-to-dropoff minutes for every ride with both timestamps, in input
/// order. Negative values are kept.
pub fn ride_durations(rides: &[RideRequest]) -> Vec<f64> {
    rides
        .iter()
        .filter_map(|r| span_minutes(r.pickup_ts, r.dropoff_ts))
        .collect()
}

/// Count, mean, sample std, min, quartiles and max. Every statistic except
/// `count` is `NaN` on empty input.
pub fn describe(values: &[f64]) -> SummaryStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let avg = mean(&sorted);

    SummaryStats {
        count: sorted.len(),
        mean: avg,
        std: stddev(&sorted, avg),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Summarizes ride durations and counts the rides that are implausibly long
/// or negative. Negative rides stay in the summary so the skew is visible.
pub fn duration_quality(rides: &[RideRequest]) -> DurationQuality {
    let durations = ride_durations(rides);

    DurationQuality {
        summary: describe(&durations),
        long_rides: durations.iter().filter(|d| **d > LONG_RIDE_MINUTES).count(),
        negative_rides: durations.iter().filter(|d| **d < 0.0).count(),
    }
}
