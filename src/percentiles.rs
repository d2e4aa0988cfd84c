//! Exact latency percentiles over a complete sample.
//!
//! Percentiles use linear interpolation between closest ranks: for
//! percentile `p` over `n` sorted values the fractional index is
//! `(p / 100) * (n - 1)`. An integral index selects that value; otherwise
//! the result is interpolated between the floor and ceiling neighbours.

use serde::Serialize;

/// Computes percentile `p` (0-100) of an ascending slice.
///
/// Returns 0.0 for an empty slice. `p` is clamped to `0..=100`.
pub fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let index = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        return sorted[lower] as f64;
    }

    let fraction = index - lower as f64;
    let low = sorted[lower] as f64;
    let high = sorted[upper] as f64;
    low + (high - low) * fraction
}

/// Latency distribution of a run, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Number of samples
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// 50th percentile - median
    pub p50: f64,
    pub p95: f64,
}

impl LatencyStats {
    /// Computes the distribution of `latencies`; all zero when empty.
    pub fn from_latencies(latencies: impl IntoIterator<Item = u64>) -> Self {
        let mut sorted: Vec<u64> = latencies.into_iter().collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_unstable();

        let count = sorted.len() as u64;
        let sum: u128 = sorted.iter().map(|&v| v as u128).sum();

        Self {
            count,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sum as f64 / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        }
    }

    /// Format statistics as a human-readable string.
    pub fn format(&self) -> String {
        format!(
            "count={}, min={}ms, max={}ms, mean={:.2}ms, p50={:.2}ms, p95={:.2}ms",
            self.count, self.min, self.max, self.mean, self.p50, self.p95,
        )
    }
}
