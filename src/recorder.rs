//! Thread-safe sink for request outcomes.
//!
//! Workers append [`RequestResult`]s concurrently while a progress reporter
//! reads the running counters without taking the result lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Outcome of one logical request, including any retries it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    /// Latency in milliseconds, measured across all attempts.
    pub latency_ms: u64,

    /// True for a 2xx response.
    pub success: bool,

    /// HTTP status code, or 0 when no response was received.
    pub status_code: u16,

    /// Error description for transport failures and timeouts.
    pub error: Option<String>,

    /// Wall-clock time at which the request completed.
    pub timestamp: DateTime<Utc>,
}

impl RequestResult {
    /// Result for a received response; success is derived from the status.
    pub fn from_status(status_code: u16, latency_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latency_ms,
            success: (200..300).contains(&status_code),
            status_code,
            error: None,
            timestamp,
        }
    }

    /// Failed result for a request that produced no response.
    pub fn failure(error: impl Into<String>, latency_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latency_ms,
            success: false,
            status_code: 0,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Point-in-time counter values read with a single atomic load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderCounts {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
}

const SUCCESS_UNIT: u64 = 1 << 32;
const FAILURE_MASK: u64 = SUCCESS_UNIT - 1;

/// Success and failure counters packed into one word.
///
/// The upper 32 bits count successes and the lower 32 bits count failures,
/// so one load always yields a pair whose sum is the total. Each half holds
/// at most `u32::MAX` outcomes per run; debug builds assert on overflow.
#[derive(Debug, Default)]
struct OutcomeCounter(AtomicU64);

impl OutcomeCounter {
    fn increment(&self, success: bool) {
        let delta = if success { SUCCESS_UNIT } else { 1 };
        let previous = self.0.fetch_add(delta, Ordering::AcqRel);
        debug_assert!(
            if success {
                previous >> 32 < u64::from(u32::MAX)
            } else {
                previous & FAILURE_MASK < FAILURE_MASK
            },
            "outcome counter overflow"
        );
    }

    fn load(&self) -> RecorderCounts {
        let packed = self.0.load(Ordering::Acquire);
        let success = packed >> 32;
        let failure = packed & FAILURE_MASK;
        RecorderCounts {
            total: success + failure,
            success,
            failure,
        }
    }

    fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Accumulates request results for a single run.
#[derive(Debug, Default)]
pub struct ResultRecorder {
    results: Mutex<Vec<RequestResult>>,
    counter: OutcomeCounter,
}

impl ResultRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result and bumps the matching counter.
    ///
    /// The counter is updated while the result lock is held, so a snapshot
    /// never contains a result that the counters have not seen.
    pub fn record(&self, result: RequestResult) {
        let success = result.success;
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        results.push(result);
        self.counter.increment(success);
    }

    /// All three counters from a single atomic load.
    pub fn counts(&self) -> RecorderCounts {
        self.counter.load()
    }

    pub fn current_count(&self) -> u64 {
        self.counter.load().total
    }

    pub fn success_count(&self) -> u64 {
        self.counter.load().success
    }

    pub fn failure_count(&self) -> u64 {
        self.counter.load().failure
    }

    /// Copies the accumulated results for aggregation.
    pub fn snapshot(&self) -> Vec<RequestResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Clears all results and counters.
    ///
    /// Tasks spawned after this returns observe the cleared state.
    pub fn reset(&self) {
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = results.len();
        results.clear();
        results.shrink_to_fit();
        self.counter.clear();
        debug!(dropped_results = dropped, "Result recorder reset");
    }
}
