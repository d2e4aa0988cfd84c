//! Terminal output for progress and results.

use std::io::Write;

use crate::load_test::{LoadTestOutcome, ProgressSink, ProgressSnapshot, RunStatus};

/// One-line progress text, e.g. `[   4.2s / 10s] 1234 requests (1230 ok, 4 failed)`.
pub fn format_progress_line(snapshot: &ProgressSnapshot, duration_secs: u64) -> String {
    format!(
        "[{:>6.1}s / {}s] {} requests ({} ok, {} failed)",
        snapshot.elapsed_secs, duration_secs, snapshot.total, snapshot.success, snapshot.failure
    )
}

/// Rewrites a single progress line on stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleProgress {
    duration_secs: u64,
}

impl ConsoleProgress {
    pub fn new(duration_secs: u64) -> Self {
        Self { duration_secs }
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, snapshot: ProgressSnapshot) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{}",
            format_progress_line(&snapshot, self.duration_secs)
        );
        let _ = stderr.flush();
    }
}

/// Full results: summary table, per-second series and distributions.
pub fn format_results(outcome: &LoadTestOutcome) -> String {
    let mut output = String::new();
    output.push_str("\n=== Load Test Results ===\n");
    if outcome.status == RunStatus::Cancelled {
        output.push_str("Run cancelled; results are partial.\n");
    }
    output.push_str(&outcome.report.statistics.format());
    output.push_str("\n=== Requests Per Second ===\n");
    output.push_str(&outcome.report.chart_data.format_series_table());
    output.push_str("\n=== Distributions ===\n");
    output.push_str(&outcome.report.chart_data.format_distributions());
    output
}
