pub mod config;
pub mod error;
pub mod loader;
pub mod merge;
pub mod metrics;
pub mod output;
pub mod records;
pub mod report;
pub mod schema;
