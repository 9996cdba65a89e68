//! Checks that ride timestamps follow request, accept, pickup, dropoff order
//! and that cancellations never precede the request.

use super::types::TimelineAnomalies;
use crate::loader::Table;
use crate::records::RideRequest;

/// Counts rides breaking the lifecycle order. A ride can appear under more
/// than one heading. Pairs with a missing side are not judged.
pub fn timeline_anomalies(rides: &Table<RideRequest>) -> TimelineAnomalies {
    let mut found = TimelineAnomalies {
        malformed_timestamps: rides.malformed_timestamps,
        ..Default::default()
    };

    for r in &rides.rows {
        if before(r.accept_ts, r.request_ts) {
            found.accept_before_request += 1;
        }
        if before(r.cancel_ts, r.request_ts) {
            found.cancel_before_request += 1;
        }
        if before(r.pickup_ts, r.accept_ts) {
            found.pickup_before_accept += 1;
        }
        if before(r.dropoff_ts, r.pickup_ts) {
            found.dropoff_before_pickup += 1;
        }
        if before(r.dropoff_ts, r.cancel_ts) {
            found.cancel_after_dropoff += 1;
        }
        if r.dropoff_ts.is_some() && r.accept_ts.is_none() {
            found.dropoff_without_accept += 1;
        }
    }

    found
}

fn before(a: Option<chrono::NaiveDateTime>, b: Option<chrono::NaiveDateTime>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}
