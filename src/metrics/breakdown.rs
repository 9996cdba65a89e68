//! Funnel performance split by platform and by age group.

use std::collections::{BTreeMap, HashSet};

use super::funnel::distinct_users;
use super::types::{AgeGroupRow, PlatformRow};
use super::utility::pct;
use crate::merge::{FunnelRecord, FunnelTable};
use crate::records::UNKNOWN_PLATFORM;

/// Downloads, completed rows and conversion per platform, ordered by label.
///
/// Rows without a platform land in the `unknown` bucket. Completed counts
/// rows of the merged table, so retried charges on one ride count once per
/// transaction row.
pub fn platform_breakdown(funnel: &FunnelTable) -> Vec<PlatformRow> {
    let mut groups: BTreeMap<String, Vec<&FunnelRecord>> = BTreeMap::new();
    for row in funnel {
        let label = row
            .platform
            .as_ref()
            .map_or(UNKNOWN_PLATFORM, |p| p.label());
        groups.entry(label.to_string()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(platform, rows)| {
            let downloads = rows
                .iter()
                .map(|r| r.app_download_key.as_str())
                .collect::<HashSet<_>>()
                .len();
            let completed_rides = rows.iter().filter(|r| r.is_completed()).count();

            PlatformRow {
                platform,
                downloads,
                completed_rides,
                conversion_pct: pct(completed_rides, downloads),
            }
        })
        .collect()
}

/// Distinct users per stage for every non-null age range, ordered by label.
pub fn age_breakdown(funnel: &FunnelTable) -> Vec<AgeGroupRow> {
    let mut groups: BTreeMap<&str, Vec<&FunnelRecord>> = BTreeMap::new();
    for row in funnel {
        if let Some(age) = row.age_range.as_deref() {
            groups.entry(age).or_default().push(row);
        }
    }

    groups
        .into_iter()
        .map(|(age, rows)| AgeGroupRow {
            age_group: age.to_string(),
            signups: distinct_users(rows.iter().copied(), |_| true),
            requests: distinct_users(rows.iter().copied(), FunnelRecord::is_requested),
            completed: distinct_users(rows.iter().copied(), FunnelRecord::is_completed),
            reviews: distinct_users(rows.iter().copied(), FunnelRecord::is_reviewed),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_funnel;
    use crate::metrics::fixtures::{datasets, download, review, ride, signup};
    use crate::records::Platform;

    #[test]
    fn test_platform_conversion_with_unknown_bucket() {
        let data = datasets(
            vec![
                download("k1", Some(Platform::Ios)),
                download("k2", Some(Platform::Ios)),
                download("k3", Some(Platform::Android)),
                download("k4", None),
            ],
            vec![signup("u1", "k1", None), signup("u3", "k3", None)],
            vec![
                ride("r1", "u1", ["10:00", "10:01", "10:05", "10:30", ""]),
                ride("r2", "u3", ["10:00", "10:01", "10:05", "10:30", "10:31"]),
            ],
            vec![],
            vec![],
        );

        let rows = platform_breakdown(&merge_funnel(&data));
        let labels: Vec<_> = rows.iter().map(|r| r.platform.as_str()).collect();
        assert_eq!(labels, vec!["android", "ios", "unknown"]);

        let ios = &rows[1];
        assert_eq!(ios.downloads, 2);
        assert_eq!(ios.completed_rides, 1);
        assert_eq!(ios.conversion_pct, 50.0);

        let android = &rows[0];
        assert_eq!(android.completed_rides, 0);
        assert_eq!(android.conversion_pct, 0.0);

        assert_eq!(rows[2].downloads, 1);
    }

    #[test]
    fn test_age_groups_sorted_and_skip_null() {
        let data = datasets(
            vec![
                download("k1", None),
                download("k2", None),
                download("k3", None),
                download("k4", None),
            ],
            vec![
                signup("u1", "k1", Some("35-44")),
                signup("u2", "k2", Some("18-24")),
                signup("u3", "k3", Some("18-24")),
                signup("u4", "k4", None),
            ],
            vec![
                ride("r1", "u2", ["10:00", "10:01", "10:05", "10:30", ""]),
                ride("r2", "u2", ["12:00", "", "", "", ""]),
                ride("r3", "u1", ["12:00", "", "", "", ""]),
            ],
            vec![],
            vec![review("v1", "r1", "u2")],
        );

        let rows = age_breakdown(&merge_funnel(&data));

        assert_eq!(
            rows,
            vec![
                AgeGroupRow {
                    age_group: "18-24".to_string(),
                    signups: 2,
                    requests: 1,
                    completed: 1,
                    reviews: 1,
                },
                AgeGroupRow {
                    age_group: "35-44".to_string(),
                    signups: 1,
                    requests: 1,
                    completed: 0,
                    reviews: 0,
                },
            ]
        );
    }

    #[test]
    fn test_empty_funnel_has_no_groups() {
        let data = datasets(vec![], vec![], vec![], vec![], vec![]);
        let funnel = merge_funnel(&data);

        assert!(platform_breakdown(&funnel).is_empty());
        assert!(age_breakdown(&funnel).is_empty());
    }
}
