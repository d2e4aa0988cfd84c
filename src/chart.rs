//! Chart-ready views over a run's results.
//!
//! Nothing here renders; the series and histograms are plain data for a
//! plotting or export collaborator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::status_code_name;
use crate::recorder::RequestResult;

/// One point of a per-second series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Whole seconds since the start of the run
    pub second_offset: u64,
    pub value: f64,
}

/// Fixed latency ranges of the response time histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LatencyRange {
    /// 0-100 ms inclusive
    UpTo100Ms,
    From100To300Ms,
    From300To500Ms,
    From500To1000Ms,
    Over1000Ms,
}

impl LatencyRange {
    /// Classifies a latency. Upper bounds are inclusive.
    pub fn classify(latency_ms: u64) -> Self {
        match latency_ms {
            0..=100 => LatencyRange::UpTo100Ms,
            101..=300 => LatencyRange::From100To300Ms,
            301..=500 => LatencyRange::From300To500Ms,
            501..=1000 => LatencyRange::From500To1000Ms,
            _ => LatencyRange::Over1000Ms,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LatencyRange::UpTo100Ms => "0-100 ms",
            LatencyRange::From100To300Ms => "100-300 ms",
            LatencyRange::From300To500Ms => "300-500 ms",
            LatencyRange::From500To1000Ms => "500-1000 ms",
            LatencyRange::Over1000Ms => ">1000 ms",
        }
    }

    /// All ranges in ascending order.
    pub fn all() -> [LatencyRange; 5] {
        [
            LatencyRange::UpTo100Ms,
            LatencyRange::From100To300Ms,
            LatencyRange::From300To500Ms,
            LatencyRange::From500To1000Ms,
            LatencyRange::Over1000Ms,
        ]
    }
}

/// Number of results that fell into a latency range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyBucket {
    pub range: LatencyRange,
    pub label: &'static str,
    pub count: u64,
}

/// Time series and distributions for charting a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Mean latency (ms) per second that had results
    pub response_time_series: Vec<TimeSeriesPoint>,

    /// Completed requests per second that had results
    pub requests_per_second_series: Vec<TimeSeriesPoint>,

    /// HTTP status code (0 for no response) to count
    pub status_code_distribution: BTreeMap<u16, u64>,

    /// Always five buckets, in [`LatencyRange::all`] order
    pub latency_distribution: Vec<LatencyBucket>,
}

impl ChartData {
    /// Buckets `results` by whole-second offset from `started_at`.
    ///
    /// Only seconds with at least one result produce a point; gaps are not
    /// zero-filled. Results stamped before `started_at` land in second 0.
    pub fn from_results(results: &[RequestResult], started_at: DateTime<Utc>) -> Self {
        let mut per_second: BTreeMap<u64, (u64, u64)> = BTreeMap::new();
        let mut status_code_distribution: BTreeMap<u16, u64> = BTreeMap::new();
        let mut range_counts: BTreeMap<LatencyRange, u64> = BTreeMap::new();

        for result in results {
            let offset = second_offset(result.timestamp, started_at);
            let entry = per_second.entry(offset).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += result.latency_ms;

            *status_code_distribution
                .entry(result.status_code)
                .or_insert(0) += 1;
            *range_counts
                .entry(LatencyRange::classify(result.latency_ms))
                .or_insert(0) += 1;
        }

        let response_time_series = per_second
            .iter()
            .map(|(&second_offset, &(count, latency_sum))| TimeSeriesPoint {
                second_offset,
                value: latency_sum as f64 / count as f64,
            })
            .collect();

        let requests_per_second_series = per_second
            .iter()
            .map(|(&second_offset, &(count, _))| TimeSeriesPoint {
                second_offset,
                value: count as f64,
            })
            .collect();

        let latency_distribution = LatencyRange::all()
            .into_iter()
            .map(|range| LatencyBucket {
                range,
                label: range.label(),
                count: range_counts.get(&range).copied().unwrap_or(0),
            })
            .collect();

        Self {
            response_time_series,
            requests_per_second_series,
            status_code_distribution,
            latency_distribution,
        }
    }

    /// Format the per-second series as a table.
    pub fn format_series_table(&self) -> String {
        if self.requests_per_second_series.is_empty() {
            return "No time series data available.\n".to_string();
        }

        let mut output = String::new();
        output.push_str(&format!(
            "{:>8} {:>10} {:>14}\n",
            "Second", "Requests", "Avg Latency"
        ));
        output.push_str(&"-".repeat(34));
        output.push('\n');

        for (rps, latency) in self
            .requests_per_second_series
            .iter()
            .zip(&self.response_time_series)
        {
            output.push_str(&format!(
                "{:>8} {:>10} {:>11.2} ms\n",
                rps.second_offset, rps.value as u64, latency.value
            ));
        }

        output
    }

    /// Format the status code and latency range distributions.
    pub fn format_distributions(&self) -> String {
        let mut output = String::from("Status codes:\n");
        for (code, count) in &self.status_code_distribution {
            output.push_str(&format!(
                "  {:<4} {:<22} {}\n",
                code,
                status_code_name(*code),
                count
            ));
        }

        output.push_str("Latency ranges:\n");
        for bucket in &self.latency_distribution {
            output.push_str(&format!("  {:<12} {}\n", bucket.label, bucket.count));
        }
        output
    }
}

fn second_offset(timestamp: DateTime<Utc>, started_at: DateTime<Utc>) -> u64 {
    let millis = (timestamp - started_at).num_milliseconds();
    millis.div_euclid(1000).max(0) as u64
}
