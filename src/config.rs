use std::collections::BTreeMap;
use tokio::time::Duration;

use reqwest::{Method, Url};

use crate::config_validation::{
    ContentTypeValidator, HttpMethodValidator, RangeValidator, UrlValidator, ValidationContext,
    ValidationError, ValidationResult,
};
use crate::utils::truncate_for_display;

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 1000;
pub const MIN_DURATION_SECS: u64 = 1;
pub const MAX_DURATION_SECS: u64 = 3600;
pub const MAX_RETRIES_LIMIT: u32 = 10;
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Immutable configuration of one load test run.
///
/// Build one with [`LoadTestConfig::builder`], which validates every field.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    pub target_url: Url,
    pub thread_count: usize,
    pub duration: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub method: Method,
    pub query_params: BTreeMap<String, String>,
    pub body: Option<String>,
    pub content_type: String,
}

impl LoadTestConfig {
    /// Starts building a configuration for `target_url`.
    pub fn builder(target_url: impl Into<String>) -> LoadTestConfigBuilder {
        LoadTestConfigBuilder::new(target_url)
    }

    /// Checks every constraint, reporting all violations at once.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut ctx = ValidationContext::new();
        ctx.check(UrlValidator::parse(self.target_url.as_str()).map(|_| ()));
        ctx.check(validate_numeric(
            self.thread_count,
            self.duration,
            self.request_timeout,
            self.max_retries,
        ));
        ctx.check(ContentTypeValidator::validate(&self.content_type));
        ctx.into_result()
    }

    /// Target URL with the configured query parameters merged in.
    ///
    /// Existing query keys in the URL are overwritten by configured ones;
    /// other existing keys are kept in their original order.
    pub fn target_uri(&self) -> Url {
        if self.query_params.is_empty() {
            return self.target_url.clone();
        }

        let mut pairs: Vec<(String, String)> = self
            .target_url
            .query_pairs()
            .filter(|(k, _)| !self.query_params.contains_key(k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(
            self.query_params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let mut uri = self.target_url.clone();
        uri.query_pairs_mut().clear().extend_pairs(pairs);
        uri
    }

    /// True when a request body is attached: non-empty body and not GET/HEAD.
    pub fn sends_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
            && self.method != Method::GET
            && self.method != Method::HEAD
    }

    /// Host component of the target URL.
    pub fn host(&self) -> &str {
        self.target_url.host_str().unwrap_or_default()
    }

    /// Configured duration in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// Prints the configuration banner.
    pub fn print_summary(&self) {
        println!("Starting load test:");
        println!("  Target URL: {}", self.target_url);
        println!("  HTTP method: {}", self.method);
        if !self.query_params.is_empty() {
            let params: Vec<String> = self
                .query_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!("  Query parameters: {}", params.join(", "));
        }
        if let Some(ref body) = self.body {
            if self.sends_body() {
                println!("  Request body: {}", truncate_for_display(body, 50));
                println!("  Content-Type: {}", self.content_type);
            } else {
                println!("  Request body: ignored for {} requests", self.method);
            }
        }
        println!("  Threads: {}", self.thread_count);
        println!("  Duration: {}s", self.duration_secs());
        println!("  Request timeout: {:?}", self.request_timeout);
        println!("  Max retries: {}", self.max_retries);
    }
}

fn validate_numeric(
    thread_count: usize,
    duration: Duration,
    request_timeout: Duration,
    max_retries: u32,
) -> ValidationResult<()> {
    let mut ctx = ValidationContext::new();
    ctx.check(RangeValidator::validate_u64(
        thread_count as u64,
        MIN_THREADS as u64,
        MAX_THREADS as u64,
        "threads",
    ));
    ctx.check(RangeValidator::validate_u64(
        duration.as_secs(),
        MIN_DURATION_SECS,
        MAX_DURATION_SECS,
        "duration",
    ));
    if duration.subsec_nanos() != 0 {
        ctx.check(Err(ValidationError::InvalidFormat {
            field: "duration".to_string(),
            message: format!("must be a whole number of seconds, got {:?}", duration),
        }));
    }
    ctx.check(RangeValidator::validate_u64(
        request_timeout.as_millis() as u64,
        1,
        MAX_REQUEST_TIMEOUT.as_millis() as u64,
        "timeout_ms",
    ));
    ctx.check(RangeValidator::validate_u64(
        max_retries as u64,
        0,
        MAX_RETRIES_LIMIT as u64,
        "max_retries",
    ));
    ctx.into_result()
}

/// Builder for [`LoadTestConfig`].
#[derive(Debug, Clone)]
pub struct LoadTestConfigBuilder {
    target_url: String,
    thread_count: usize,
    duration: Duration,
    request_timeout: Duration,
    max_retries: u32,
    method: String,
    query_params: BTreeMap<String, String>,
    body: Option<String>,
    content_type: String,
}

impl LoadTestConfigBuilder {
    fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            thread_count: 10,
            duration: Duration::from_secs(30),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            method: Method::GET.to_string(),
            query_params: BTreeMap::new(),
            body: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn duration_secs(self, secs: u64) -> Self {
        self.duration(Duration::from_secs(secs))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets one query parameter. A repeated key keeps the last value.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn query_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.query_params.extend(params);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Validates every field and produces the configuration.
    pub fn build(self) -> ValidationResult<LoadTestConfig> {
        let mut ctx = ValidationContext::new();

        let target_url = UrlValidator::parse(&self.target_url);
        let method = HttpMethodValidator::parse(&self.method);
        if let Err(ref e) = target_url {
            ctx.check(Err(e.clone()));
        }
        if let Err(ref e) = method {
            ctx.check(Err(e.clone()));
        }
        ctx.check(validate_numeric(
            self.thread_count,
            self.duration,
            self.request_timeout,
            self.max_retries,
        ));
        ctx.check(ContentTypeValidator::validate(&self.content_type));
        ctx.into_result()?;

        Ok(LoadTestConfig {
            target_url: target_url?,
            thread_count: self.thread_count,
            duration: self.duration,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            method: method?,
            query_params: self.query_params,
            body: self.body,
            content_type: self.content_type,
        })
    }
}
