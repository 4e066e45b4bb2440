//! Metrics for proxy renders and conversions.
//!
//! Recorded through the `metrics` facade; the host installs the recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PROXY_JOBS_COMMITTED_TOTAL: &str = "vproxy_jobs_committed_total";
    pub const PROXY_JOBS_ABORTED_TOTAL: &str = "vproxy_jobs_aborted_total";
    pub const PROXY_JOBS_FAILED_TOTAL: &str = "vproxy_jobs_failed_total";
    pub const PROXY_JOB_DURATION_SECONDS: &str = "vproxy_job_duration_seconds";
    pub const RENDER_SESSIONS_TOTAL: &str = "vproxy_render_sessions_total";
    pub const CONVERSIONS_TOTAL: &str = "vproxy_conversions_total";
}

/// Record a job reaching a terminal state.
pub fn record_job(state: &str, duration_secs: f64) {
    let name = match state {
        "committed" => names::PROXY_JOBS_COMMITTED_TOTAL,
        "aborted" => names::PROXY_JOBS_ABORTED_TOTAL,
        _ => names::PROXY_JOBS_FAILED_TOTAL,
    };
    counter!(name).increment(1);
    histogram!(names::PROXY_JOB_DURATION_SECONDS).record(duration_secs);
}

/// Record the end of a render session.
pub fn record_session(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RENDER_SESSIONS_TOTAL, &labels).increment(1);
}

/// Record the end of a project conversion.
pub fn record_conversion(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::CONVERSIONS_TOTAL, &labels).increment(1);
}
