//! Row builders shared by the calculator tests.

use std::path::PathBuf;

use crate::loader::{Datasets, Table};
use crate::records::{
    AppDownload, Platform, Review, RideRequest, Signup, Transaction, parse_timestamp,
};

/// `HH:MM` on 2021-01-01; an empty string is a null timestamp.
pub(crate) fn at(time: &str) -> Option<chrono::NaiveDateTime> {
    if time.is_empty() {
        return None;
    }
    parse_timestamp(&format!("2021-01-01 {time}:00"))
}

/// Ride with `[request, accept, pickup, dropoff, cancel]` times.
pub(crate) fn ride(id: &str, user: &str, ts: [&str; 5]) -> RideRequest {
    let [request, accept, pickup, dropoff, cancel] = ts;
    RideRequest {
        ride_id: id.to_string(),
        user_id: Some(user.to_string()),
        driver_id: Some(format!("driver-{id}")),
        request_ts: at(request),
        accept_ts: at(accept),
        pickup_location: Some("Mitte".to_string()),
        dropoff_location: Some("Kreuzberg".to_string()),
        pickup_ts: at(pickup),
        dropoff_ts: at(dropoff),
        cancel_ts: at(cancel),
    }
}

pub(crate) fn download(key: &str, platform: Option<Platform>) -> AppDownload {
    AppDownload {
        app_download_key: key.to_string(),
        platform,
        download_ts: at("08:00"),
    }
}

pub(crate) fn signup(user: &str, session: &str, age: Option<&str>) -> Signup {
    Signup {
        user_id: user.to_string(),
        session_id: Some(session.to_string()),
        signup_ts: at("09:00"),
        age_range: age.map(str::to_string),
    }
}

pub(crate) fn transaction(id: &str, ride: &str, amount: f64, status: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        ride_id: Some(ride.to_string()),
        purchase_amount_usd: Some(amount),
        charge_status: Some(status.to_string()),
        transaction_ts: at("23:00"),
    }
}

pub(crate) fn review(id: &str, ride: &str, user: &str) -> Review {
    Review {
        review_id: id.to_string(),
        ride_id: Some(ride.to_string()),
        user_id: Some(user.to_string()),
        driver_id: None,
        rating: Some(4.0),
        review: Some("ok".to_string()),
    }
}

pub(crate) fn table<T>(name: &str, rows: Vec<T>) -> Table<T> {
    Table {
        file_name: name.to_string(),
        path: PathBuf::from(name),
        columns: vec![],
        rows,
        malformed_timestamps: 0,
    }
}

pub(crate) fn datasets(
    downloads: Vec<AppDownload>,
    signups: Vec<Signup>,
    rides: Vec<RideRequest>,
    transactions: Vec<Transaction>,
    reviews: Vec<Review>,
) -> Datasets {
    Datasets {
        data_dir: PathBuf::from("."),
        app_downloads: table("app_downloads.csv", downloads),
        signups: table("signups.csv", signups),
        ride_requests: table("ride_requests.csv", rides),
        transactions: table("transactions.csv", transactions),
        reviews: table("reviews.csv", reviews),
    }
}
