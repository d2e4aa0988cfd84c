use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use prometheus::{
    Encoder, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::env;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

lazy_static::lazy_static! {
    pub static ref METRIC_NAMESPACE: String =
        env::var("METRIC_NAMESPACE").unwrap_or_else(|_| "api_pulse".to_string());

    pub static ref REQUEST_TOTAL: IntCounter =
        IntCounter::with_opts(
            Opts::new("requests_total", "Total number of logical HTTP requests recorded")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref REQUEST_STATUS_CODES: IntCounterVec =
        IntCounterVec::new(
            Opts::new("requests_status_codes_total", "Number of HTTP requests by status code")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["status_code"]
        ).unwrap();

    pub static ref REQUEST_ERRORS_BY_CATEGORY: IntCounterVec =
        IntCounterVec::new(
            Opts::new("requests_errors_total", "Number of failed HTTP requests by error category")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["category"]
        ).unwrap();

    pub static ref REQUEST_RETRIES_TOTAL: IntCounter =
        IntCounter::with_opts(
            Opts::new("request_retries_total", "Number of retry attempts after transient failures")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref CONCURRENT_REQUESTS: Gauge =
        Gauge::with_opts(
            Opts::new("concurrent_requests", "Number of HTTP requests currently in flight")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref ACTIVE_WORKERS: IntGauge =
        IntGauge::with_opts(
            Opts::new("active_workers", "Number of worker tasks currently generating load")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref REQUEST_DURATION_SECONDS: Histogram =
        Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "request_duration_seconds",
                "HTTP request latencies in seconds, including retries."
            ).namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();
}

/// Registers all metrics with the default Prometheus registry.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let registry = prometheus::default_registry();
    registry.register(Box::new(REQUEST_TOTAL.clone()))?;
    registry.register(Box::new(REQUEST_STATUS_CODES.clone()))?;
    registry.register(Box::new(REQUEST_ERRORS_BY_CATEGORY.clone()))?;
    registry.register(Box::new(REQUEST_RETRIES_TOTAL.clone()))?;
    registry.register(Box::new(CONCURRENT_REQUESTS.clone()))?;
    registry.register(Box::new(ACTIVE_WORKERS.clone()))?;
    registry.register(Box::new(REQUEST_DURATION_SECONDS.clone()))?;
    Ok(())
}

/// Returns a static string label for common HTTP status codes.
///
/// Uncommon codes fall back to "other" to keep label cardinality bounded.
pub fn status_code_label(code: u16) -> &'static str {
    match code {
        0 => "error",
        200 => "200",
        201 => "201",
        202 => "202",
        204 => "204",
        301 => "301",
        302 => "302",
        304 => "304",
        400 => "400",
        401 => "401",
        403 => "403",
        404 => "404",
        405 => "405",
        408 => "408",
        409 => "409",
        422 => "422",
        429 => "429",
        500 => "500",
        502 => "502",
        503 => "503",
        504 => "504",
        _ => "other",
    }
}

fn encode_registry(registry: &Arc<Mutex<Registry>>) -> Result<Vec<u8>, prometheus::Error> {
    let metric_families = registry
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}

/// HTTP handler for the Prometheus metrics endpoint.
pub async fn metrics_handler(
    _req: Request<Body>,
    registry: Arc<Mutex<Registry>>,
) -> Result<Response<Body>, hyper::Error> {
    let response = match encode_registry(&registry) {
        Ok(buffer) => {
            let mut response = Response::new(Body::from(buffer));
            if let Ok(value) = TextEncoder::new().format_type().parse() {
                response
                    .headers_mut()
                    .insert(hyper::header::CONTENT_TYPE, value);
            }
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            let mut response = Response::new(Body::from("# ERROR ENCODING METRICS"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    };
    Ok(response)
}

/// Starts the Prometheus metrics HTTP server.
///
/// Runs until the process exits; bind failures are logged and end the task.
pub async fn start_metrics_server(port: u16, registry: Arc<Mutex<Registry>>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let make_svc = make_service_fn(move |_conn| {
        let registry_clone = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let registry_clone_inner = registry_clone.clone();
                async move { metrics_handler(req, registry_clone_inner).await }
            }))
        }
    });

    let builder = match Server::try_bind(&addr) {
        Ok(builder) => builder,
        Err(e) => {
            error!(port = port, error = %e, "Failed to bind metrics server");
            return;
        }
    };

    info!(
        port = port,
        addr = %addr,
        "Metrics server listening"
    );

    if let Err(e) = builder.serve(make_svc).await {
        error!(error = %e, "Metrics server error");
    }
}

/// Gathers and encodes metrics as a string for final output.
pub fn gather_metrics_string(registry: &Arc<Mutex<Registry>>) -> String {
    match encode_registry(registry).map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            error!(error = %e, "Error encoding metrics to UTF-8");
            String::from("# ERROR ENCODING METRICS TO UTF-8")
        }
        Err(e) => {
            error!(error = %e, "Error encoding metrics");
            String::from("# ERROR ENCODING METRICS")
        }
    }
}
