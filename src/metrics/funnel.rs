//! Distinct users reaching each funnel stage.

use std::collections::HashSet;

use super::types::{FunnelStage, FunnelStep, FunnelSteps};
use super::utility::pct;
use crate::merge::{FunnelRecord, FunnelTable};

/// Counts distinct users per stage over the merged table.
///
/// Downloads count distinct download keys; every later stage counts distinct
/// `user_id` values among rows whose stage marker is set. Counts are not
/// forced to be non-increasing; see [`FunnelSteps::increases`].
pub fn funnel_steps(funnel: &FunnelTable) -> FunnelSteps {
    let downloads = funnel
        .iter()
        .map(|r| r.app_download_key.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut steps = Vec::with_capacity(FunnelStage::ALL.len());
    let mut previous: Option<usize> = None;

    for stage in FunnelStage::ALL {
        let count = match stage {
            FunnelStage::Downloads => downloads,
            FunnelStage::Signups => distinct_users(funnel, |_| true),
            FunnelStage::Requests => distinct_users(funnel, FunnelRecord::is_requested),
            FunnelStage::Accepted => distinct_users(funnel, FunnelRecord::is_accepted),
            FunnelStage::Completed => distinct_users(funnel, FunnelRecord::is_completed),
            FunnelStage::Payment => distinct_users(funnel, FunnelRecord::is_paid),
            FunnelStage::Reviews => distinct_users(funnel, FunnelRecord::is_reviewed),
        };

        steps.push(FunnelStep {
            stage,
            count,
            pct_of_initial: pct(count, downloads),
            pct_of_previous: pct(count, previous.unwrap_or(count)),
        });
        previous = Some(count);
    }

    FunnelSteps { steps }
}

/// Distinct non-null users among rows matching `reached`.
pub(crate) fn distinct_users<'a, I, F>(rows: I, reached: F) -> usize
where
    I: IntoIterator<Item = &'a FunnelRecord>,
    F: Fn(&FunnelRecord) -> bool,
{
    rows.into_iter()
        .filter(|&r| reached(r))
        .filter_map(|r| r.user_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}
