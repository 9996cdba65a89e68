//! Typed rows for the five input tables.
//!
//! Timestamp and amount columns are parsed leniently: anything that does not
//! parse becomes `None` instead of failing the load.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Bucket used when a funnel row carries no platform.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Only this charge status counts toward revenue.
pub const APPROVED: &str = "Approved";

/// Install platform of an app download.
///
/// Labels are lower-cased on read; values outside ios/android/web are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Ios,
    Android,
    Web,
    Other(String),
}

impl Platform {
    pub fn label(&self) -> &str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
            Platform::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Platform {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            "web" => Platform::Web,
            _ => Platform::Other(normalized),
        }
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.label().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppDownload {
    pub app_download_key: String,
    pub platform: Option<Platform>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub download_ts: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Signup {
    pub user_id: String,
    pub session_id: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub signup_ts: Option<NaiveDateTime>,
    pub age_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RideRequest {
    pub ride_id: String,
    pub user_id: Option<String>,
    pub driver_id: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub request_ts: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub accept_ts: Option<NaiveDateTime>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub pickup_ts: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub dropoff_ts: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub cancel_ts: Option<NaiveDateTime>,
}

impl RideRequest {
    /// Dropped off and never cancelled.
    pub fn is_completed(&self) -> bool {
        self.dropoff_ts.is_some() && self.cancel_ts.is_none()
    }

    /// Matched with a driver, whatever happened afterwards.
    pub fn is_accepted(&self) -> bool {
        self.accept_ts.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub ride_id: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub purchase_amount_usd: Option<f64>,
    pub charge_status: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub transaction_ts: Option<NaiveDateTime>,
}

impl Transaction {
    pub fn is_approved(&self) -> bool {
        self.charge_status.as_deref() == Some(APPROVED)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub ride_id: Option<String>,
    pub user_id: Option<String>,
    pub driver_id: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    pub review: Option<String>,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses an ISO-like date-time into a timezone-naive value.
///
/// Offsets are dropped and the wall-clock time is kept. A bare date maps to
/// midnight. Returns `None` for empty or unrecognised text.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }

    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.naive_local());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `true` when the cell holds text that is not a recognised timestamp.
pub fn is_malformed_timestamp(raw: &str) -> bool {
    !raw.trim().is_empty() && parse_timestamp(raw).is_none()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}
