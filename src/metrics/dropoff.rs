//! Diagnostics for rides that were accepted but never completed.

use chrono::Timelike;
use std::collections::BTreeMap;

use super::types::{DropoffDiagnostics, HourCount};
use super::utility::{mean, pct, span_minutes};
use crate::records::RideRequest;

/// Abandoners who waited longer than this before cancelling are counted.
pub const LONG_WAIT_MINUTES: f64 = 10.0;

/// Number of peak cancellation hours reported.
pub const TOP_CANCEL_HOURS: usize = 3;

pub fn dropoff_diagnostics(rides: &[RideRequest]) -> DropoffDiagnostics {
    let stalled: Vec<&RideRequest> = rides
        .iter()
        .filter(|r| r.accept_ts.is_some() && r.dropoff_ts.is_none())
        .collect();

    let abandoned: Vec<&RideRequest> = stalled
        .iter()
        .copied()
        .filter(|r| r.cancel_ts.is_some())
        .collect();

    let wait_completed: Vec<f64> = rides
        .iter()
        .filter(|r| r.is_completed())
        .filter_map(|r| span_minutes(r.accept_ts, r.pickup_ts))
        .collect();

    let wait_before_cancel: Vec<f64> = abandoned
        .iter()
        .filter_map(|r| span_minutes(r.accept_ts, r.cancel_ts))
        .collect();

    let long_waiters = wait_before_cancel
        .iter()
        .filter(|w| **w > LONG_WAIT_MINUTES)
        .count();

    DropoffDiagnostics {
        accepted_not_completed: stalled.len(),
        cancelled: abandoned.len(),
        cancelled_pct: pct(abandoned.len(), stalled.len()),
        avg_wait_completed_minutes: mean(&wait_completed),
        avg_wait_before_cancel_minutes: mean(&wait_before_cancel),
        long_waiters,
        long_waiters_pct: pct(long_waiters, abandoned.len()),
        top_cancel_hours: top_hours(abandoned.iter().filter_map(|r| r.cancel_ts), TOP_CANCEL_HOURS),
    }
}

/// Most frequent hours of day, highest count first, earlier hour on ties.
fn top_hours<I>(timestamps: I, limit: usize) -> Vec<HourCount>
where
    I: Iterator<Item = chrono::NaiveDateTime>,
{
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(ts.hour()).or_default() += 1;
    }

    let mut ranked: Vec<HourCount> = counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    ranked.truncate(limit);
    ranked
}
