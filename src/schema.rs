//! Required column sets for the five input files and the check that enforces them.

use std::collections::{BTreeSet, HashSet};

use crate::error::LoadError;

pub const APP_DOWNLOADS: &str = "app_downloads.csv";
pub const SIGNUPS: &str = "signups.csv";
pub const RIDE_REQUESTS: &str = "ride_requests.csv";
pub const TRANSACTIONS: &str = "transactions.csv";
pub const REVIEWS: &str = "reviews.csv";

/// File name and the columns its header must contain.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub file_name: &'static str,
    pub required: &'static [&'static str],
}

/// Every input file in load order.
pub static REQUIRED_SCHEMAS: &[TableSchema] = &[
    TableSchema {
        file_name: APP_DOWNLOADS,
        required: &["app_download_key", "platform", "download_ts"],
    },
    TableSchema {
        file_name: SIGNUPS,
        required: &["user_id", "session_id", "signup_ts", "age_range"],
    },
    TableSchema {
        file_name: RIDE_REQUESTS,
        required: &[
            "ride_id",
            "user_id",
            "driver_id",
            "request_ts",
            "accept_ts",
            "pickup_location",
            "dropoff_location",
            "pickup_ts",
            "dropoff_ts",
            "cancel_ts",
        ],
    },
    TableSchema {
        file_name: TRANSACTIONS,
        required: &[
            "transaction_id",
            "ride_id",
            "purchase_amount_usd",
            "charge_status",
            "transaction_ts",
        ],
    },
    TableSchema {
        file_name: REVIEWS,
        required: &["review_id", "ride_id", "user_id", "driver_id", "rating", "review"],
    },
];

/// Looks up the schema registered for `file_name`.
pub fn schema_for(file_name: &str) -> Option<&'static TableSchema> {
    REQUIRED_SCHEMAS.iter().find(|s| s.file_name == file_name)
}

/// Fails when any name in `required` is absent from `columns`.
///
/// Matching is exact and case-sensitive. The error lists every missing
/// column in ascending order together with `label`.
pub fn ensure_required_columns<'a, I>(
    columns: I,
    required: &[&str],
    label: &str,
) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: HashSet<&str> = columns.into_iter().collect();

    let missing: BTreeSet<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(LoadError::MissingColumns {
        table: label.to_string(),
        columns: missing.into_iter().map(str::to_string).collect(),
    })
}
