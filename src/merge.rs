//! Denormalizes the five tables into one funnel table.
//!
//! Join chain, all left joins:
//!
//! ```text
//! app_downloads.app_download_key = signups.session_id
//!   -> ride_requests on user_id
//!   -> transactions on ride_id
//!   -> reviews on ride_id
//! ```
//!
//! Rows are never dropped; unmatched right sides stay `None`. Fan-out follows
//! right-table order, so the output is fully determined by the input order.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::loader::Datasets;
use crate::records::{APPROVED, AppDownload, Platform, Review, RideRequest, Signup, Transaction};
use crate::schema::{REVIEWS, RIDE_REQUESTS, TRANSACTIONS};

/// Output columns of the funnel table in order. `user_id` and `driver_id`
/// appear once each.
pub const MERGED_COLUMNS: &[&str] = &[
    "app_download_key",
    "platform",
    "download_ts",
    "user_id",
    "session_id",
    "signup_ts",
    "age_range",
    "ride_id",
    "driver_id",
    "request_ts",
    "accept_ts",
    "pickup_location",
    "dropoff_location",
    "pickup_ts",
    "dropoff_ts",
    "cancel_ts",
    "transaction_id",
    "purchase_amount_usd",
    "charge_status",
    "transaction_ts",
    "review_id",
    "rating",
    "review",
];

/// Right-side columns that duplicate an earlier column and are not carried
/// into the funnel table. The join keys are equal to the surviving column;
/// the review's user and driver ids yield to the signup and ride values.
pub const DROPPED_DUPLICATES: &[(&str, &str)] = &[
    (RIDE_REQUESTS, "user_id"),
    (TRANSACTIONS, "ride_id"),
    (REVIEWS, "ride_id"),
    (REVIEWS, "user_id"),
    (REVIEWS, "driver_id"),
];

/// One row of the merged funnel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunnelRecord {
    pub app_download_key: String,
    pub platform: Option<Platform>,
    pub download_ts: Option<NaiveDateTime>,

    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub signup_ts: Option<NaiveDateTime>,
    pub age_range: Option<String>,

    pub ride_id: Option<String>,
    pub driver_id: Option<String>,
    pub request_ts: Option<NaiveDateTime>,
    pub accept_ts: Option<NaiveDateTime>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_ts: Option<NaiveDateTime>,
    pub dropoff_ts: Option<NaiveDateTime>,
    pub cancel_ts: Option<NaiveDateTime>,

    pub transaction_id: Option<String>,
    pub purchase_amount_usd: Option<f64>,
    pub charge_status: Option<String>,
    pub transaction_ts: Option<NaiveDateTime>,

    pub review_id: Option<String>,
    pub rating: Option<f64>,
    pub review: Option<String>,
}

impl FunnelRecord {
    fn from_download(d: &AppDownload) -> Self {
        FunnelRecord {
            app_download_key: d.app_download_key.clone(),
            platform: d.platform.clone(),
            download_ts: d.download_ts,
            ..Default::default()
        }
    }

    fn with_signup(&mut self, s: &Signup) {
        self.user_id = Some(s.user_id.clone());
        self.session_id = s.session_id.clone();
        self.signup_ts = s.signup_ts;
        self.age_range = s.age_range.clone();
    }

    fn with_ride(&mut self, r: &RideRequest) {
        self.ride_id = Some(r.ride_id.clone());
        self.driver_id = r.driver_id.clone();
        self.request_ts = r.request_ts;
        self.accept_ts = r.accept_ts;
        self.pickup_location = r.pickup_location.clone();
        self.dropoff_location = r.dropoff_location.clone();
        self.pickup_ts = r.pickup_ts;
        self.dropoff_ts = r.dropoff_ts;
        self.cancel_ts = r.cancel_ts;
    }

    fn with_transaction(&mut self, t: &Transaction) {
        self.transaction_id = Some(t.transaction_id.clone());
        self.purchase_amount_usd = t.purchase_amount_usd;
        self.charge_status = t.charge_status.clone();
        self.transaction_ts = t.transaction_ts;
    }

    fn with_review(&mut self, r: &Review) {
        self.review_id = Some(r.review_id.clone());
        self.rating = r.rating;
        self.review = r.review.clone();
    }

    pub fn is_requested(&self) -> bool {
        self.request_ts.is_some()
    }

    pub fn is_accepted(&self) -> bool {
        self.accept_ts.is_some()
    }

    /// Dropped off and never cancelled.
    pub fn is_completed(&self) -> bool {
        self.dropoff_ts.is_some() && self.cancel_ts.is_none()
    }

    pub fn is_paid(&self) -> bool {
        self.charge_status.as_deref() == Some(APPROVED)
    }

    pub fn is_reviewed(&self) -> bool {
        self.review_id.is_some()
    }
}

/// The merged funnel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunnelTable {
    pub rows: Vec<FunnelRecord>,
}

impl FunnelTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunnelRecord> {
        self.rows.iter()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        MERGED_COLUMNS
    }
}

impl<'a> IntoIterator for &'a FunnelTable {
    type Item = &'a FunnelRecord;
    type IntoIter = std::slice::Iter<'a, FunnelRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Builds the funnel table. Pure: calling it twice on the same datasets
/// yields equal tables.
#[tracing::instrument(skip_all)]
pub fn merge_funnel(data: &Datasets) -> FunnelTable {
    let signups_by_session = index_by(&data.signups.rows, |s| s.session_id.as_deref());
    let rides_by_user = index_by(&data.ride_requests.rows, |r| r.user_id.as_deref());
    let tx_by_ride = index_by(&data.transactions.rows, |t| t.ride_id.as_deref());
    let reviews_by_ride = index_by(&data.reviews.rows, |r| r.ride_id.as_deref());

    let roots: Vec<FunnelRecord> = data
        .app_downloads
        .rows
        .iter()
        .map(FunnelRecord::from_download)
        .collect();

    let rows = left_join(
        roots,
        &signups_by_session,
        |f| Some(f.app_download_key.as_str()),
        FunnelRecord::with_signup,
    );
    debug!(rows = rows.len(), "Joined signups");

    let rows = left_join(rows, &rides_by_user, |f| f.user_id.as_deref(), FunnelRecord::with_ride);
    debug!(rows = rows.len(), "Joined ride requests");

    let rows = left_join(
        rows,
        &tx_by_ride,
        |f| f.ride_id.as_deref(),
        FunnelRecord::with_transaction,
    );
    debug!(rows = rows.len(), "Joined transactions");

    let rows = left_join(
        rows,
        &reviews_by_ride,
        |f| f.ride_id.as_deref(),
        FunnelRecord::with_review,
    );

    info!(
        rows = rows.len(),
        columns = MERGED_COLUMNS.len(),
        "Funnel merge complete"
    );

    FunnelTable { rows }
}

/// Groups `rows` by a key, keeping input order inside each group. Empty and
/// missing keys never match anything.
fn index_by<'a, T, F>(rows: &'a [T], key: F) -> HashMap<&'a str, Vec<&'a T>>
where
    F: Fn(&'a T) -> Option<&'a str>,
{
    let mut index: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for row in rows {
        if let Some(k) = key(row).filter(|k| !k.is_empty()) {
            index.entry(k).or_default().push(row);
        }
    }
    index
}

fn left_join<R, K, A>(
    left: Vec<FunnelRecord>,
    right: &HashMap<&str, Vec<&R>>,
    left_key: K,
    apply: A,
) -> Vec<FunnelRecord>
where
    K: Fn(&FunnelRecord) -> Option<&str>,
    A: Fn(&mut FunnelRecord, &R),
{
    let mut out = Vec::with_capacity(left.len());

    for row in left {
        let matches = left_key(&row).and_then(|k| right.get(k));
        match matches {
            Some(found) => {
                for r in found {
                    let mut joined = row.clone();
                    apply(&mut joined, r);
                    out.push(joined);
                }
            }
            None => out.push(row),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Table;
    use crate::records::parse_timestamp;
    use crate::schema::REQUIRED_SCHEMAS;
    use std::path::PathBuf;

    #[test]
    fn test_left_joins_keep_every_download() {
        let data = fixture();
        let funnel = merge_funnel(&data);

        assert!(funnel.len() >= data.app_downloads.len());
        let keys: Vec<_> = funnel.iter().map(|r| r.app_download_key.as_str()).collect();
        for d in &data.app_downloads.rows {
            assert!(keys.contains(&d.app_download_key.as_str()));
        }
    }

    #[test]
    fn test_fan_out_per_ride_and_transaction() {
        let funnel = merge_funnel(&fixture());

        // k1 -> u1 -> r1 (two transactions) + r2; k2 -> u2 (no ride); k3 alone
        assert_eq!(funnel.len(), 5);

        let r1_rows: Vec<_> = funnel
            .iter()
            .filter(|r| r.ride_id.as_deref() == Some("r1"))
            .collect();
        assert_eq!(r1_rows.len(), 2);
        assert_eq!(r1_rows[0].transaction_id.as_deref(), Some("t1"));
        assert_eq!(r1_rows[1].transaction_id.as_deref(), Some("t2"));
    }

    #[test]
    fn test_unmatched_rows_gain_nulls() {
        let funnel = merge_funnel(&fixture());

        let k3 = funnel
            .iter()
            .find(|r| r.app_download_key == "k3")
            .unwrap();
        assert_eq!(k3.user_id, None);
        assert_eq!(k3.ride_id, None);

        let k2 = funnel
            .iter()
            .find(|r| r.app_download_key == "k2")
            .unwrap();
        assert_eq!(k2.user_id.as_deref(), Some("u2"));
        assert_eq!(k2.ride_id, None);
    }

    #[test]
    fn test_driver_and_user_come_from_signup_and_ride() {
        let funnel = merge_funnel(&fixture());

        let reviewed = funnel
            .iter()
            .find(|r| r.review_id.is_some())
            .unwrap();
        // review row names a different user and driver; the canonical ones win
        assert_eq!(reviewed.user_id.as_deref(), Some("u1"));
        assert_eq!(reviewed.driver_id.as_deref(), Some("d1"));
    }

    #[test]
    fn test_merged_columns_are_sources_minus_dropped_duplicates() {
        let derived: Vec<&str> = REQUIRED_SCHEMAS
            .iter()
            .flat_map(|schema| {
                schema
                    .required
                    .iter()
                    .copied()
                    .filter(move |col| !DROPPED_DUPLICATES.contains(&(schema.file_name, *col)))
            })
            .collect();

        assert_eq!(derived, MERGED_COLUMNS);
    }

    #[test]
    fn test_single_user_and_driver_column() {
        let user_cols = MERGED_COLUMNS.iter().filter(|c| **c == "user_id").count();
        let driver_cols = MERGED_COLUMNS.iter().filter(|c| **c == "driver_id").count();
        assert_eq!(user_cols, 1);
        assert_eq!(driver_cols, 1);
        assert!(DROPPED_DUPLICATES.contains(&(REVIEWS, "driver_id")));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let data = fixture();
        assert_eq!(merge_funnel(&data), merge_funnel(&data));
    }

    #[test]
    fn test_empty_session_id_does_not_match_empty_key() {
        let mut data = fixture();
        data.app_downloads.rows.push(AppDownload {
            app_download_key: String::new(),
            platform: None,
            download_ts: None,
        });
        data.signups.rows.push(Signup {
            user_id: "u9".to_string(),
            session_id: Some(String::new()),
            signup_ts: None,
            age_range: None,
        });

        let funnel = merge_funnel(&data);
        assert!(funnel.iter().all(|r| r.user_id.as_deref() != Some("u9")));
    }

    fn table<T>(name: &str, rows: Vec<T>) -> Table<T> {
        Table {
            file_name: name.to_string(),
            path: PathBuf::from(name),
            columns: vec![],
            rows,
            malformed_timestamps: 0,
        }
    }

    fn fixture() -> Datasets {
        let ts = |s: &str| parse_timestamp(s);
        Datasets {
            data_dir: PathBuf::from("."),
            app_downloads: table(
                "app_downloads.csv",
                vec![
                    download("k1", Platform::Ios),
                    download("k2", Platform::Android),
                    download("k3", Platform::Web),
                ],
            ),
            signups: table(
                "signups.csv",
                vec![
                    Signup {
                        user_id: "u1".to_string(),
                        session_id: Some("k1".to_string()),
                        signup_ts: ts("2021-01-01 09:00:00"),
                        age_range: Some("18-24".to_string()),
                    },
                    Signup {
                        user_id: "u2".to_string(),
                        session_id: Some("k2".to_string()),
                        signup_ts: ts("2021-01-01 09:30:00"),
                        age_range: Some("25-34".to_string()),
                    },
                ],
            ),
            ride_requests: table(
                "ride_requests.csv",
                vec![
                    RideRequest {
                        ride_id: "r1".to_string(),
                        user_id: Some("u1".to_string()),
                        driver_id: Some("d1".to_string()),
                        request_ts: ts("2021-01-01 10:00:00"),
                        accept_ts: ts("2021-01-01 10:02:00"),
                        pickup_location: None,
                        dropoff_location: None,
                        pickup_ts: ts("2021-01-01 10:10:00"),
                        dropoff_ts: ts("2021-01-01 10:40:00"),
                        cancel_ts: None,
                    },
                    RideRequest {
                        ride_id: "r2".to_string(),
                        user_id: Some("u1".to_string()),
                        driver_id: None,
                        request_ts: ts("2021-01-02 18:00:00"),
                        accept_ts: None,
                        pickup_location: None,
                        dropoff_location: None,
                        pickup_ts: None,
                        dropoff_ts: None,
                        cancel_ts: ts("2021-01-02 18:07:00"),
                    },
                ],
            ),
            transactions: table(
                "transactions.csv",
                vec![
                    Transaction {
                        transaction_id: "t1".to_string(),
                        ride_id: Some("r1".to_string()),
                        purchase_amount_usd: Some(12.5),
                        charge_status: Some("Declined".to_string()),
                        transaction_ts: None,
                    },
                    Transaction {
                        transaction_id: "t2".to_string(),
                        ride_id: Some("r1".to_string()),
                        purchase_amount_usd: Some(12.5),
                        charge_status: Some(APPROVED.to_string()),
                        transaction_ts: None,
                    },
                ],
            ),
            reviews: table(
                "reviews.csv",
                vec![Review {
                    review_id: "v1".to_string(),
                    ride_id: Some("r1".to_string()),
                    user_id: Some("someone-else".to_string()),
                    driver_id: Some("d-other".to_string()),
                    rating: Some(5.0),
                    review: Some("great".to_string()),
                }],
            ),
        }
    }

    fn download(key: &str, platform: Platform) -> AppDownload {
        AppDownload {
            app_download_key: key.to_string(),
            platform: Some(platform),
            download_ts: parse_timestamp("2021-01-01 08:00:00"),
        }
    }
}
