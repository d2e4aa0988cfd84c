//! Final statistics for a completed load test run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::LoadTestConfig;
use crate::percentiles::LatencyStats;
use crate::recorder::RequestResult;

/// Aggregate statistics computed once from the full result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub target_url: String,
    pub host: String,
    pub thread_count: usize,
    /// Configured duration
    pub duration_secs: u64,

    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub mean_latency_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,

    /// Total requests divided by the actual elapsed wall time
    pub requests_per_second: f64,

    /// Percentage of successful requests (0-100)
    pub success_rate: f64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StatisticsSummary {
    /// Computes the summary of `results` for a run between `started_at` and `finished_at`.
    ///
    /// Throughput divides by the actual elapsed time rather than the
    /// configured duration so that cancelled runs report a true rate. With no
    /// results every numeric field is zero.
    pub fn from_results(
        config: &LoadTestConfig,
        results: &[RequestResult],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let latency = LatencyStats::from_latencies(results.iter().map(|r| r.latency_ms));

        let total_requests = results.len() as u64;
        let successful_requests = results.iter().filter(|r| r.success).count() as u64;
        let failed_requests = total_requests - successful_requests;

        let elapsed_secs = elapsed_secs(started_at, finished_at);
        let requests_per_second = if total_requests > 0 && elapsed_secs > 0.0 {
            total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        let success_rate = if total_requests > 0 {
            successful_requests as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };

        Self {
            target_url: config.target_url.to_string(),
            host: config.host().to_string(),
            thread_count: config.thread_count,
            duration_secs: config.duration_secs(),
            min_latency_ms: latency.min,
            max_latency_ms: latency.max,
            mean_latency_ms: latency.mean,
            median_latency_ms: latency.p50,
            p95_latency_ms: latency.p95,
            total_requests,
            successful_requests,
            failed_requests,
            requests_per_second,
            success_rate,
            started_at,
            finished_at,
        }
    }

    /// Actual wall time of the run in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        elapsed_secs(self.started_at, self.finished_at)
    }

    /// Format the summary as a multi-line table.
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:<22} {}\n", "Target URL:", self.target_url));
        output.push_str(&format!("{:<22} {}\n", "Host:", self.host));
        output.push_str(&format!("{:<22} {}\n", "Threads:", self.thread_count));
        output.push_str(&format!(
            "{:<22} {}s (actual {:.2}s)\n",
            "Duration:",
            self.duration_secs,
            self.elapsed_secs()
        ));
        output.push_str(&"-".repeat(50));
        output.push('\n');
        output.push_str(&format!("{:<22} {} ms\n", "Min latency:", self.min_latency_ms));
        output.push_str(&format!("{:<22} {} ms\n", "Max latency:", self.max_latency_ms));
        output.push_str(&format!(
            "{:<22} {:.2} ms\n",
            "Mean latency:", self.mean_latency_ms
        ));
        output.push_str(&format!(
            "{:<22} {:.2} ms\n",
            "Median latency:", self.median_latency_ms
        ));
        output.push_str(&format!(
            "{:<22} {:.2} ms\n",
            "95th percentile:", self.p95_latency_ms
        ));
        output.push_str(&"-".repeat(50));
        output.push('\n');
        output.push_str(&format!("{:<22} {}\n", "Total requests:", self.total_requests));
        output.push_str(&format!(
            "{:<22} {}\n",
            "Successful:", self.successful_requests
        ));
        output.push_str(&format!("{:<22} {}\n", "Failed:", self.failed_requests));
        output.push_str(&format!("{:<22} {:.2}%\n", "Success rate:", self.success_rate));
        output.push_str(&format!(
            "{:<22} {:.2} req/s\n",
            "Throughput:", self.requests_per_second
        ));
        output
    }
}

/// Zero when `finished_at` precedes `started_at`.
fn elapsed_secs(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> f64 {
    (finished_at - started_at)
        .to_std()
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn config() -> LoadTestConfig {
        LoadTestConfig::builder("https://api.example.com/v1/items")
            .threads(4)
            .duration_secs(10)
            .build()
            .unwrap()
    }

    fn result(status: u16, latency_ms: u64, at: DateTime<Utc>) -> RequestResult {
        RequestResult::from_status(status, latency_ms, at)
    }

    #[test]
    fn empty_results_are_all_zero() {
        let start = Utc::now();
        let summary = StatisticsSummary::from_results(&config(), &[], start, start);

        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.min_latency_ms, 0);
        assert_eq!(summary.max_latency_ms, 0);
        assert_eq!(summary.mean_latency_ms, 0.0);
        assert_eq!(summary.median_latency_ms, 0.0);
        assert_eq!(summary.p95_latency_ms, 0.0);
        assert_eq!(summary.requests_per_second, 0.0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.host, "api.example.com");
        assert_eq!(summary.thread_count, 4);
        assert_eq!(summary.duration_secs, 10);
    }

    #[test]
    fn throughput_uses_actual_elapsed_time() {
        let start = Utc::now();
        let end = start + ChronoDuration::seconds(2);
        let results: Vec<_> = (0..10).map(|i| result(200, 10 + i, start)).collect();

        let summary = StatisticsSummary::from_results(&config(), &results, start, end);
        assert!((summary.requests_per_second - 5.0).abs() < 1e-9);
        assert!((summary.elapsed_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn sub_millisecond_run_has_throughput() {
        let start = Utc::now();
        let end = start + ChronoDuration::microseconds(500);
        let results = vec![result(200, 0, start), result(200, 0, start)];

        let summary = StatisticsSummary::from_results(&config(), &results, start, end);
        assert!((summary.requests_per_second - 4000.0).abs() < 1e-6);

        let reversed = StatisticsSummary::from_results(&config(), &results, end, start);
        assert_eq!(reversed.requests_per_second, 0.0);
    }

    #[test]
    fn success_rate_and_partition() {
        let start = Utc::now();
        let end = start + ChronoDuration::seconds(1);
        let results = vec![
            result(200, 10, start),
            result(201, 20, start),
            result(404, 30, start),
            RequestResult::failure("connection reset", 40, start),
        ];

        let summary = StatisticsSummary::from_results(&config(), &results, start, end);
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.successful_requests, 2);
        assert_eq!(summary.failed_requests, 2);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.median_latency_ms, 25.0);
        assert!((summary.p95_latency_ms - 38.5).abs() < 1e-9);
    }

    #[test]
    fn format_contains_key_figures() {
        let start = Utc::now();
        let end = start + ChronoDuration::seconds(1);
        let results = vec![result(200, 12, start)];
        let text = StatisticsSummary::from_results(&config(), &results, start, end).format();
        assert!(text.contains("Total requests:"));
        assert!(text.contains("100.00%"));
        assert!(text.contains("api.example.com"));
    }
}
