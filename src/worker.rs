use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::executor::{failure_category, ExecutionOutcome, RequestExecutor};
use crate::metrics::{
    status_code_label, ACTIVE_WORKERS, CONCURRENT_REQUESTS, REQUEST_DURATION_SECONDS,
    REQUEST_ERRORS_BY_CATEGORY, REQUEST_STATUS_CODES, REQUEST_TOTAL,
};
use crate::recorder::{RequestResult, ResultRecorder};

/// Configuration for a worker task.
pub struct WorkerConfig {
    pub task_id: usize,
    pub executor: RequestExecutor,
    pub recorder: Arc<ResultRecorder>,
    pub stop: CancellationToken,
}

/// Keeps the active worker gauge accurate even if the task is aborted.
struct ActiveWorkerGuard;

impl ActiveWorkerGuard {
    fn enter() -> Self {
        ACTIVE_WORKERS.inc();
        Self
    }
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        ACTIVE_WORKERS.dec();
    }
}

/// Runs one closed-loop worker: send, record, repeat until stopped.
///
/// The stop signal is checked before every request and there is no pause
/// between iterations. Returns the number of results this worker recorded.
pub async fn run_worker(config: WorkerConfig) -> u64 {
    let _guard = ActiveWorkerGuard::enter();
    let mut recorded: u64 = 0;

    debug!(
        task_id = config.task_id,
        url = %config.executor.request().url,
        "Worker starting"
    );

    while !config.stop.is_cancelled() {
        CONCURRENT_REQUESTS.inc();
        let outcome = config.executor.execute(&config.stop).await;
        CONCURRENT_REQUESTS.dec();

        match outcome {
            ExecutionOutcome::Completed(result) => {
                observe(config.task_id, &result);
                config.recorder.record(result);
                recorded += 1;
            }
            ExecutionOutcome::Cancelled => break,
        }
    }

    debug!(
        task_id = config.task_id,
        recorded = recorded,
        "Worker stopped"
    );
    recorded
}

fn observe(task_id: usize, result: &RequestResult) {
    REQUEST_TOTAL.inc();
    REQUEST_DURATION_SECONDS.observe(result.latency_ms as f64 / 1000.0);
    REQUEST_STATUS_CODES
        .with_label_values(&[status_code_label(result.status_code)])
        .inc();

    if let Some(category) = failure_category(result) {
        REQUEST_ERRORS_BY_CATEGORY
            .with_label_values(&[category.label()])
            .inc();

        match result.error {
            Some(ref error) => warn!(
                task_id = task_id,
                error = %error,
                error_category = category.label(),
                latency_ms = result.latency_ms,
                "Request failed"
            ),
            None => debug!(
                task_id = task_id,
                status_code = result.status_code,
                error_category = category.label(),
                "Request returned non-success status"
            ),
        }
    } else {
        debug!(
            task_id = task_id,
            status_code = result.status_code,
            latency_ms = result.latency_ms,
            "Request completed"
        );
    }
}
