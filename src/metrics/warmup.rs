//! Headline counts over the raw tables.

use std::collections::{HashMap, HashSet};

use super::types::{LabelCount, SignupDropoff, WarmupStats};
use super::utility::{mean, pct, span_minutes};
use crate::loader::Datasets;
use crate::records::{AppDownload, RideRequest, Signup, Transaction, UNKNOWN_PLATFORM};

pub fn warmup_stats(data: &Datasets) -> WarmupStats {
    let rides = &data.ride_requests.rows;
    let (approved_charges, total_revenue_usd) = charged_rides_and_revenue(&data.transactions.rows);

    WarmupStats {
        downloads: data.app_downloads.len(),
        signups: data.signups.len(),
        ride_requests: rides.len(),
        completed_rides: count_completed_rides(rides),
        unique_requesting_users: unique_requesting_users(rides),
        avg_ride_duration_minutes: average_ride_duration_minutes(rides),
        accepted_rides: count_accepted_rides(rides),
        approved_charges,
        total_revenue_usd,
        downloads_per_platform: downloads_per_platform(&data.app_downloads.rows),
        requests_per_platform: ride_requests_per_platform(
            rides,
            &data.signups.rows,
            &data.app_downloads.rows,
        ),
        signup_to_request: dropoff_signup_to_request(&data.signups.rows, rides),
    }
}

pub fn count_completed_rides(rides: &[RideRequest]) -> usize {
    rides.iter().filter(|r| r.is_completed()).count()
}

pub fn count_accepted_rides(rides: &[RideRequest]) -> usize {
    rides.iter().filter(|r| r.is_accepted()).count()
}

/// Distinct non-null `user_id` values among ride requests.
pub fn unique_requesting_users(rides: &[RideRequest]) -> usize {
    rides
        .iter()
        .filter_map(|r| r.user_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Mean pickup-to-dropoff minutes over completed rides. `NaN` if there are none.
pub fn average_ride_duration_minutes(rides: &[RideRequest]) -> f64 {
    let durations: Vec<f64> = rides
        .iter()
        .filter(|r| r.is_completed())
        .filter_map(|r| span_minutes(r.pickup_ts, r.dropoff_ts))
        .collect();
    mean(&durations)
}

/// Count and summed amount of approved charges. Rows with no parseable
/// amount count as charges but add nothing to revenue.
pub fn charged_rides_and_revenue(transactions: &[Transaction]) -> (usize, f64) {
    transactions
        .iter()
        .filter(|t| t.is_approved())
        .fold((0, 0.0), |(n, sum), t| {
            (n + 1, sum + t.purchase_amount_usd.unwrap_or(0.0))
        })
}

/// Downloads per platform; rows without a platform count as `unknown`.
pub fn downloads_per_platform(downloads: &[AppDownload]) -> Vec<LabelCount> {
    count_labels(downloads.iter().map(platform_label))
}

/// Ride requests per platform, resolved through signup and download.
///
/// Requests whose user or session does not resolve count as `unknown`.
pub fn ride_requests_per_platform(
    rides: &[RideRequest],
    signups: &[Signup],
    downloads: &[AppDownload],
) -> Vec<LabelCount> {
    let mut signups_by_user: HashMap<&str, Vec<&Signup>> = HashMap::new();
    for s in signups {
        signups_by_user.entry(s.user_id.as_str()).or_default().push(s);
    }

    let mut downloads_by_key: HashMap<&str, Vec<&AppDownload>> = HashMap::new();
    for d in downloads {
        downloads_by_key
            .entry(d.app_download_key.as_str())
            .or_default()
            .push(d);
    }

    let mut labels = Vec::new();
    for ride in rides {
        let matched = ride
            .user_id
            .as_deref()
            .and_then(|u| signups_by_user.get(u));

        let Some(matched) = matched else {
            labels.push(UNKNOWN_PLATFORM.to_string());
            continue;
        };

        for signup in matched {
            let found = signup
                .session_id
                .as_deref()
                .and_then(|k| downloads_by_key.get(k));
            match found {
                Some(ds) => labels.extend(ds.iter().map(|d| platform_label(d))),
                None => labels.push(UNKNOWN_PLATFORM.to_string()),
            }
        }
    }

    count_labels(labels.into_iter())
}

/// Share of signups that never requested a ride. The rate is `NaN` when
/// there are no signups.
pub fn dropoff_signup_to_request(signups: &[Signup], rides: &[RideRequest]) -> SignupDropoff {
    let total = signups.len();
    let users_with_request = unique_requesting_users(rides);

    SignupDropoff {
        signups: total,
        users_with_request,
        dropoff_pct: pct(total.saturating_sub(users_with_request), total),
    }
}

fn platform_label(d: &AppDownload) -> String {
    d.platform
        .as_ref()
        .map_or_else(|| UNKNOWN_PLATFORM.to_string(), |p| p.label().to_string())
}

/// Counts labels, most frequent first, ties broken alphabetically.
pub(crate) fn count_labels<I>(labels: I) -> Vec<LabelCount>
where
    I: Iterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut out: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}
