//! How long riders actually wait versus how long they wait before giving up.
//!
//! Medians are used throughout; a handful of stuck requests would otherwise
//! dominate the picture.

use super::types::{PatienceMetrics, Phase, PhaseTiming};
use super::utility::{median, span_minutes};
use crate::records::RideRequest;

pub fn patience_metrics(rides: &[RideRequest]) -> PatienceMetrics {
    PatienceMetrics {
        search: search_timing(rides),
        pickup: pickup_timing(rides),
    }
}

/// Request to accept, against request to cancel for riders never matched.
pub fn search_timing(rides: &[RideRequest]) -> PhaseTiming {
    let reality: Vec<f64> = rides
        .iter()
        .filter(|r| r.accept_ts.is_some())
        .filter_map(|r| span_minutes(r.request_ts, r.accept_ts))
        .collect();

    let patience: Vec<f64> = rides
        .iter()
        .filter(|r| r.cancel_ts.is_some() && r.accept_ts.is_none())
        .filter_map(|r| span_minutes(r.request_ts, r.cancel_ts))
        .collect();

    timing(Phase::Search, &reality, &patience)
}

/// Accept to pickup, against accept to cancel for matched riders who
/// cancelled, whether or not a pickup was ever recorded.
pub fn pickup_timing(rides: &[RideRequest]) -> PhaseTiming {
    let reality: Vec<f64> = rides
        .iter()
        .filter(|r| r.pickup_ts.is_some())
        .filter_map(|r| span_minutes(r.accept_ts, r.pickup_ts))
        .collect();

    let patience: Vec<f64> = rides
        .iter()
        .filter(|r| r.cancel_ts.is_some() && r.accept_ts.is_some())
        .filter_map(|r| span_minutes(r.accept_ts, r.cancel_ts))
        .collect();

    timing(Phase::Pickup, &reality, &patience)
}

fn timing(phase: Phase, reality: &[f64], patience: &[f64]) -> PhaseTiming {
    PhaseTiming {
        phase,
        reality_minutes: median(reality),
        reality_samples: reality.len(),
        patience_minutes: median(patience),
        patience_samples: patience.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::ride;

    #[test]
    fn test_cancel_before_accept_feeds_search_patience_only() {
        let rides = vec![ride("r1", "u1", ["10:00", "", "", "", "10:06"])];

        let metrics = patience_metrics(&rides);

        assert_eq!(metrics.search.patience_minutes, 6.0);
        assert_eq!(metrics.search.patience_samples, 1);
        assert_eq!(metrics.pickup.patience_samples, 0);
        assert!(metrics.pickup.patience_minutes.is_nan());
    }

    #[test]
    fn test_cancel_after_accept_feeds_pickup_patience() {
        let rides = vec![
            ride("r1", "u1", ["10:00", "10:02", "", "", "10:12"]),
            ride("r2", "u1", ["10:00", "10:02", "10:08", "", "10:30"]),
        ];

        let metrics = patience_metrics(&rides);

        assert_eq!(metrics.pickup.patience_samples, 2);
        assert_eq!(metrics.pickup.patience_minutes, 19.0);
        assert_eq!(metrics.search.patience_samples, 0);
    }

    #[test]
    fn test_reality_uses_median_not_mean() {
        let rides = vec![
            ride("r1", "u1", ["10:00", "10:01", "10:05", "10:20", ""]),
            ride("r2", "u1", ["10:00", "10:02", "10:06", "10:20", ""]),
            ride("r3", "u1", ["10:00", "13:00", "13:04", "13:20", ""]),
        ];

        let metrics = patience_metrics(&rides);

        assert_eq!(metrics.search.reality_minutes, 2.0);
        assert_eq!(metrics.pickup.reality_minutes, 4.0);
        assert_eq!(metrics.search.reality_samples, 3);
    }

    #[test]
    fn test_no_rides_is_nan() {
        let metrics = patience_metrics(&[]);
        assert!(metrics.search.reality_minutes.is_nan());
        assert!(metrics.search.patience_minutes.is_nan());
        assert!(metrics.pickup.reality_minutes.is_nan());
        assert!(metrics.pickup.patience_minutes.is_nan());
    }
}
