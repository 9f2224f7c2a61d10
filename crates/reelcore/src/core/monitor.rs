//! Failure-monitor hook consumed by the retry executor and orchestrator.
//!
//! The monitor is fire-and-forget: `report` is synchronous, must never
//! panic, and must never block the calling task. Implementations that
//! need I/O (alert channels, external collectors) should enqueue and
//! return immediately.

use std::sync::Mutex;

/// Category of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// An upstream call exhausted its retry budget
    UpstreamFailure,
    /// Upstream rejected credentials — rotation likely needed
    Unauthorized,
    /// Every fallback candidate failed for a request
    AllMethodsFailed,
    /// Upstream response shape no longer matches our expectations
    MalformedResponse,
}

impl FailureKind {
    /// Stable string identifier for external collectors.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UpstreamFailure => "upstream_failure",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::AllMethodsFailed => "all_methods_failed",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }
}

/// A single failure report.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
    /// Attempts made before giving up (1 for non-retried failures)
    pub attempts: u32,
}

/// Sink for failure reports.
pub trait FailureMonitor: Send + Sync {
    /// Record a failure. Must not panic or block.
    fn report(&self, report: FailureReport);
}

/// Monitor that writes reports to the log and nothing else.
pub struct LogMonitor;

impl FailureMonitor for LogMonitor {
    fn report(&self, report: FailureReport) {
        log::warn!(
            "failure monitor: kind={} attempts={} message={}",
            report.kind.as_str(),
            report.attempts,
            report.message
        );
    }
}

/// Monitor that discards reports. Useful as a test default.
pub struct NullMonitor;

impl FailureMonitor for NullMonitor {
    fn report(&self, _report: FailureReport) {}
}

/// Monitor that records reports in memory for assertions.
#[derive(Default)]
pub struct RecordingMonitor {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl FailureMonitor for RecordingMonitor {
    fn report(&self, report: FailureReport) {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_monitor_captures_reports() {
        let monitor = RecordingMonitor::new();
        monitor.report(FailureReport {
            kind: FailureKind::UpstreamFailure,
            message: "timeout".into(),
            attempts: 3,
        });
        let reports = monitor.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, FailureKind::UpstreamFailure);
        assert_eq!(reports[0].attempts, 3);
    }

    #[test]
    fn test_kind_identifiers() {
        assert_eq!(FailureKind::AllMethodsFailed.as_str(), "all_methods_failed");
        assert_eq!(FailureKind::Unauthorized.as_str(), "unauthorized");
    }
}
