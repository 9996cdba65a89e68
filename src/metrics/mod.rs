//! Funnel metric calculators.
//!
//! Every calculator is a pure function over the loaded tables or the merged
//! funnel. None depends on another's output, so they can run in any order.

pub mod breakdown;
pub mod demand;
pub mod dropoff;
pub mod duration;
pub mod funnel;
pub mod patience;
pub mod timeline;
pub mod types;
pub mod utility;
pub mod warmup;

#[cfg(test)]
pub(crate) mod fixtures;

pub use breakdown::{age_breakdown, platform_breakdown};
pub use demand::hourly_demand;
pub use dropoff::dropoff_diagnostics;
pub use duration::duration_quality;
pub use funnel::funnel_steps;
pub use patience::patience_metrics;
pub use timeline::timeline_anomalies;
pub use warmup::warmup_stats;
