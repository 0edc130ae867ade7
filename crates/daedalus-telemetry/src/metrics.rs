//! Call metrics.
//!
//! Metrics go through the `metrics` facade; installing an exporter is up to
//! the host process. Without a recorder every call here is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `daedalus_calls_total` | Counter | `action`, `outcome` |
//! | `daedalus_call_duration_seconds` | Histogram | `action` |
//! | `daedalus_faults_total` | Counter | `kind` |

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Counter of dispatched calls.
pub const CALLS_TOTAL: &str = "daedalus_calls_total";

/// Histogram of call durations.
pub const CALL_DURATION_SECONDS: &str = "daedalus_call_duration_seconds";

/// Counter of unexpected faults.
pub const FAULTS_TOTAL: &str = "daedalus_faults_total";

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The envelope carries no errors.
    Success,
    /// A caller-facing error stopped the call.
    Rejected,
    /// An internal error or panic went through the error hook.
    Fault,
}

impl CallOutcome {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Fault => "fault",
        }
    }
}

/// Registers descriptions for the standard metrics.
pub fn describe_metrics() {
    describe_counter!(CALLS_TOTAL, "Total number of dispatched calls");
    describe_histogram!(CALL_DURATION_SECONDS, "Call duration in seconds");
    describe_counter!(FAULTS_TOTAL, "Unexpected faults caught by the error hook");
}

/// Records a finished call.
pub fn record_call(action: &str, outcome: CallOutcome, duration: Duration) {
    counter!(
        CALLS_TOTAL,
        "action" => action.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(CALL_DURATION_SECONDS, "action" => action.to_string())
        .record(duration.as_secs_f64());
}

/// Records a fault handled by the error hook.
pub fn record_fault(kind: &'static str) {
    counter!(FAULTS_TOTAL, "kind" => kind).increment(1);
}
