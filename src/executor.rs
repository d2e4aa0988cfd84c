//! Request execution with timeout, retry and outcome classification.
//!
//! One call to [`RequestExecutor::execute`] issues one logical request. The
//! transport is retried internally on transient failures; the caller only
//! sees the final [`ExecutionOutcome`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::LoadTestConfig;
use crate::errors::{ErrorCategory, TransportError};
use crate::metrics::REQUEST_RETRIES_TOTAL;
use crate::recorder::RequestResult;

/// Base delay of the exponential retry backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// A fully resolved request, built once per worker and reused for every send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Target URL with query parameters already merged
    pub url: Url,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

impl PreparedRequest {
    /// Resolves the target URI and decides whether a body is attached.
    pub fn from_config(config: &LoadTestConfig) -> Self {
        let (body, content_type) = if config.sends_body() {
            (config.body.clone(), Some(config.content_type.clone()))
        } else {
            (None, None)
        };

        Self {
            method: config.method.clone(),
            url: config.target_uri(),
            body,
            content_type,
        }
    }
}

/// Sends a single HTTP request attempt and reports the response status.
///
/// Implementations must be cancel-safe: the executor drops the returned
/// future when the test is stopped.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<u16, TransportError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<u16, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        if let Some(ref body) = request.body {
            if let Some(ref content_type) = request.content_type {
                builder = builder.header(CONTENT_TYPE, content_type.as_str());
            }
            builder = builder.body(body.clone());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let status = response.status().as_u16();

        // Stream and discard the body so the connection can be reused
        // without buffering the whole payload.
        loop {
            match response.chunk().await {
                Ok(Some(_chunk)) => {}
                Ok(None) => break,
                Err(e) => return Err(TransportError::from_reqwest(&e)),
            }
        }

        Ok(status)
    }
}

/// Exponential backoff: retry `n` (1-based) waits `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Final outcome of one logical request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// At least one attempt finished; the result must be recorded.
    Completed(RequestResult),

    /// The test was stopped before any attempt finished.
    Cancelled,
}

#[derive(Debug)]
enum Attempt {
    Response(u16),
    Failed(TransportError),
    TimedOut,
}

impl Attempt {
    fn is_retryable(&self) -> bool {
        match self {
            Attempt::Response(status) => *status >= 500 || *status == 408,
            Attempt::Failed(e) => e.category.is_transient(),
            Attempt::TimedOut => false,
        }
    }
}

/// Issues requests for one worker.
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    request: PreparedRequest,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        request: PreparedRequest,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            request,
            timeout,
            retry,
        }
    }

    /// Executor for `config` with the default backoff base delay.
    pub fn from_config(transport: Arc<dyn HttpTransport>, config: &LoadTestConfig) -> Self {
        Self::new(
            transport,
            PreparedRequest::from_config(config),
            config.request_timeout,
            RetryPolicy::new(config.max_retries),
        )
    }

    pub fn request(&self) -> &PreparedRequest {
        &self.request
    }

    /// Runs one logical request, retrying transient failures.
    ///
    /// Stopping `cancel` abandons the attempt in flight. If no attempt has
    /// finished yet the outcome is `Cancelled`; otherwise the last finished
    /// attempt is returned so that no produced result is lost. Latency spans
    /// every attempt and backoff.
    pub async fn execute(&self, cancel: &CancellationToken) -> ExecutionOutcome {
        let started = Instant::now();
        let mut last: Option<Attempt> = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    url = %self.request.url,
                    "Retrying request"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(delay) => {}
                }
                REQUEST_RETRIES_TOTAL.inc();
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = time::timeout(self.timeout, self.transport.send(&self.request)) => match res {
                    Ok(Ok(status)) => Attempt::Response(status),
                    Ok(Err(e)) if e.is_timeout() => Attempt::TimedOut,
                    Ok(Err(e)) => Attempt::Failed(e),
                    Err(_) => Attempt::TimedOut,
                },
            };

            let retry = outcome.is_retryable();
            last = Some(outcome);
            if !retry {
                break;
            }
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let timestamp = Utc::now();

        match last {
            None => ExecutionOutcome::Cancelled,
            Some(Attempt::Response(status)) => {
                ExecutionOutcome::Completed(RequestResult::from_status(status, latency_ms, timestamp))
            }
            Some(Attempt::Failed(e)) => {
                ExecutionOutcome::Completed(RequestResult::failure(e.message, latency_ms, timestamp))
            }
            Some(Attempt::TimedOut) => ExecutionOutcome::Completed(RequestResult::failure(
                format!("Request timeout after {:?}", self.timeout),
                latency_ms,
                timestamp,
            )),
        }
    }
}

/// Error category of a recorded failure, for metric labels.
pub fn failure_category(result: &RequestResult) -> Option<ErrorCategory> {
    if result.success {
        return None;
    }
    if result.status_code != 0 {
        return ErrorCategory::from_status_code(result.status_code);
    }
    match result.error.as_deref() {
        Some(msg) if msg.starts_with("Request timeout") => Some(ErrorCategory::TimeoutError),
        _ => Some(ErrorCategory::NetworkError),
    }
}
