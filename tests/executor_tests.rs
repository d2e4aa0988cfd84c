use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, Url};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use api_pulse::config::LoadTestConfig;
use api_pulse::errors::{ErrorCategory, TransportError};
use api_pulse::executor::{
    ExecutionOutcome, HttpTransport, PreparedRequest, RequestExecutor, ReqwestTransport,
    RetryPolicy,
};
use api_pulse::recorder::RequestResult;

/// Replays a fixed list of attempt outcomes, repeating the last one.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<u16, TransportError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<u16, TransportError>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    fn with_delay(script: Vec<Result<u16, TransportError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, _request: &PreparedRequest) -> Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

fn request() -> PreparedRequest {
    PreparedRequest {
        method: Method::GET,
        url: Url::parse("http://localhost/health").unwrap(),
        body: None,
        content_type: None,
    }
}

fn executor(transport: Arc<ScriptedTransport>, max_retries: u32, base_delay_ms: u64) -> RequestExecutor {
    RequestExecutor::new(
        transport,
        request(),
        Duration::from_secs(5),
        RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(base_delay_ms)),
    )
}

fn completed(outcome: ExecutionOutcome) -> RequestResult {
    match outcome {
        ExecutionOutcome::Completed(result) => result,
        ExecutionOutcome::Cancelled => panic!("expected a completed outcome"),
    }
}

fn refused() -> TransportError {
    TransportError::new(ErrorCategory::NetworkError, "connection refused")
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let transport = ScriptedTransport::new(vec![Ok(503), Ok(502), Ok(200)]);
    let result = completed(
        executor(transport.clone(), 3, 1)
            .execute(&CancellationToken::new())
            .await,
    );

    assert!(result.success);
    assert_eq!(result.status_code, 200);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let transport = ScriptedTransport::new(vec![Ok(500)]);
    let result = completed(
        executor(transport.clone(), 2, 1)
            .execute(&CancellationToken::new())
            .await,
    );

    assert!(!result.success);
    assert_eq!(result.status_code, 500);
    assert_eq!(result.error, None);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok(404), Ok(200)]);
    let result = completed(
        executor(transport.clone(), 3, 1)
            .execute(&CancellationToken::new())
            .await,
    );

    assert_eq!(result.status_code, 404);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn transport_errors_are_recorded_with_status_zero() {
    let transport = ScriptedTransport::new(vec![Err(refused())]);
    let result = completed(
        executor(transport.clone(), 1, 1)
            .execute(&CancellationToken::new())
            .await,
    );

    assert!(!result.success);
    assert_eq!(result.status_code, 0);
    assert_eq!(result.error.as_deref(), Some("connection refused"));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn timeouts_fail_without_retry() {
    let transport = ScriptedTransport::with_delay(vec![Ok(200)], Duration::from_millis(500));
    let executor = RequestExecutor::new(
        transport.clone(),
        request(),
        Duration::from_millis(50),
        RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)),
    );

    let result = completed(executor.execute(&CancellationToken::new()).await);
    assert!(!result.success);
    assert_eq!(result.status_code, 0);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("Request timeout")));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn latency_covers_every_attempt() {
    let transport = ScriptedTransport::new(vec![Ok(500), Ok(200)]);
    let started = Instant::now();
    let result = completed(
        executor(transport, 1, 20)
            .execute(&CancellationToken::new())
            .await,
    );

    // One retry waits base * 2 = 40 ms.
    assert!(result.success);
    assert!(result.latency_ms >= 40, "latency {}", result.latency_ms);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn cancel_before_first_response_records_nothing() {
    let transport = ScriptedTransport::with_delay(vec![Ok(200)], Duration::from_secs(10));
    let executor = executor(transport, 0, 1);
    let cancel = CancellationToken::new();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    assert_eq!(executor.execute(&cancel).await, ExecutionOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    trigger.await.unwrap();
}

#[tokio::test]
async fn cancel_during_backoff_keeps_last_attempt() {
    let transport = ScriptedTransport::new(vec![Ok(503), Ok(200)]);
    let executor = executor(transport.clone(), 3, 10_000);
    let cancel = CancellationToken::new();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let result = completed(executor.execute(&cancel).await);
    assert_eq!(result.status_code, 503);
    assert_eq!(transport.calls(), 1);
    trigger.await.unwrap();
}

#[tokio::test]
async fn reqwest_transport_sends_body_query_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .and(header("content-type", "text/plain"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let config = LoadTestConfig::builder(format!("{}/items", server.uri()))
        .method("POST")
        .query_param("page", "2")
        .body("hello")
        .content_type("text/plain")
        .build()
        .unwrap();

    let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
    let executor = RequestExecutor::from_config(transport, &config);
    let result = completed(executor.execute(&CancellationToken::new()).await);

    assert!(result.success);
    assert_eq!(result.status_code, 201);
}

#[tokio::test]
async fn reqwest_transport_omits_body_for_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = LoadTestConfig::builder(format!("{}/items", server.uri()))
        .body("ignored")
        .build()
        .unwrap();

    let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
    let result = completed(
        RequestExecutor::from_config(transport, &config)
            .execute(&CancellationToken::new())
            .await,
    );
    assert_eq!(result.status_code, 200);
}

#[tokio::test]
async fn unreachable_target_is_a_transport_failure() {
    let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
    let executor = RequestExecutor::new(
        transport,
        PreparedRequest {
            url: Url::parse("http://127.0.0.1:1/").unwrap(),
            ..request()
        },
        Duration::from_secs(2),
        RetryPolicy::new(0),
    );

    let result = completed(executor.execute(&CancellationToken::new()).await);
    assert!(!result.success);
    assert_eq!(result.status_code, 0);
    assert!(result.error.is_some());
}
