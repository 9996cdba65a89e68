//! Ride requests by hour of day.

use chrono::Timelike;
use std::collections::BTreeMap;

use super::types::HourCount;
use crate::records::RideRequest;

/// Request counts per observed hour (0-23), ascending by hour.
///
/// Requests without a parseable `request_ts` are not counted.
pub fn hourly_demand(rides: &[RideRequest]) -> Vec<HourCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for ts in rides.iter().filter_map(|r| r.request_ts) {
        *counts.entry(ts.hour()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// Hour with the most requests; the earliest such hour on ties.
pub fn peak_hour(demand: &[HourCount]) -> Option<HourCount> {
    demand
        .iter()
        .copied()
        .max_by(|a, b| a.count.cmp(&b.count).then(b.hour.cmp(&a.hour)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::ride;

    #[test]
    fn test_sorted_by_hour_not_frequency() {
        let rides = vec![
            ride("r1", "u1", ["18:10", "", "", "", ""]),
            ride("r2", "u1", ["18:20", "", "", "", ""]),
            ride("r3", "u1", ["18:30", "", "", "", ""]),
            ride("r4", "u1", ["07:00", "", "", "", ""]),
            ride("r5", "u1", ["23:59", "", "", "", ""]),
            ride("r6", "u1", ["", "", "", "", ""]),
        ];

        let demand = hourly_demand(&rides);

        assert_eq!(
            demand,
            vec![
                HourCount { hour: 7, count: 1 },
                HourCount { hour: 18, count: 3 },
                HourCount { hour: 23, count: 1 },
            ]
        );
        assert_eq!(peak_hour(&demand), Some(HourCount { hour: 18, count: 3 }));
    }

    #[test]
    fn test_empty_input() {
        assert!(hourly_demand(&[]).is_empty());
        assert_eq!(peak_hour(&[]), None);
    }
}
