//! Abandoned-object bookkeeping: detecting borrows that were never
//! returned and never will be, and reporting them.
//!
//! The actual reclaim sequence lives on [`crate::pool::GenericObjectPool`]
//! (it needs direct access to the idle deque and the all-objects index);
//! this module holds the parts that are pure data and pure logic, in the
//! style of a quarantine entry/reason type kept separate from its manager.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::wrapper::{CallSite, PooledObject};

/// A snapshot describing a wrapper the sweeper decided to reclaim, shaped
/// for the `logAbandoned` sink. `detected_at` is a wall-clock timestamp —
/// unlike the rest of a wrapper's bookkeeping, which is all monotonic
/// `Instant`s, this is the one place a report leaves the pool and needs a
/// timestamp an external log consumer can actually correlate against.
#[derive(Debug, Clone)]
pub struct AbandonedReport {
    pub creation_token: u64,
    pub allocated_for: Duration,
    pub detected_at: DateTime<Utc>,
    pub borrow_call_site: Option<CallSite>,
    pub use_call_site: Option<CallSite>,
}

impl std::fmt::Display for AbandonedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pooled object #{} reclaimed as abandoned at {} after {:.1}s allocated, borrowed at {}",
            self.creation_token,
            self.detected_at.to_rfc3339(),
            self.allocated_for.as_secs_f64(),
            self.borrow_call_site
                .as_ref()
                .map(|c| c.caller.as_str())
                .unwrap_or("<unknown>")
        )
    }
}

/// Whether `wrapper`, currently `Allocated`, has been idle-while-borrowed
/// longer than `timeout`. When `use_usage_tracking` is set the borrower is
/// expected to call `use()` periodically, so the more recent of
/// borrow/use activity counts; otherwise only the original borrow matters.
pub(crate) fn is_overdue<T>(
    wrapper: &PooledObject<T>,
    timeout: Duration,
    use_usage_tracking: bool,
) -> bool {
    let reference = if use_usage_tracking {
        wrapper.last_activity_instant()
    } else {
        wrapper.last_borrow_instant()
    };
    reference.elapsed() > timeout
}

pub(crate) fn build_report<T>(wrapper: &PooledObject<T>) -> AbandonedReport {
    AbandonedReport {
        creation_token: wrapper.creation_token(),
        allocated_for: wrapper.last_borrow_instant().elapsed(),
        detected_at: Utc::now(),
        borrow_call_site: wrapper.borrow_call_site(),
        use_call_site: wrapper.use_call_site(),
    }
}

pub(crate) fn log_report(report: &AbandonedReport) {
    tracing::warn!(
        creation_token = report.creation_token,
        allocated_for_secs = report.allocated_for.as_secs_f64(),
        detected_at = %report.detected_at.to_rfc3339(),
        caller = report
            .borrow_call_site
            .as_ref()
            .map(|c| c.caller.as_str())
            .unwrap_or("<unknown>"),
        "{}",
        report
    );
}
