//! Command line and environment configuration.

use std::path::PathBuf;

use clap::Parser;
use tokio::time::Duration;

use crate::client::ClientConfig;
use crate::config::{LoadTestConfig, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_RETRIES};
use crate::config_validation::{ValidationError, ValidationResult};
use crate::export::ExportFormat;
use crate::history::{default_history_path, UrlHistory};
use crate::utils::{parse_duration_string, parse_query_string};

#[derive(Parser, Debug, Clone)]
#[command(name = "api-pulse", version)]
#[command(about = "Fixed-duration HTTP load tester")]
pub struct Args {
    /// Target URL; defaults to the most recent URL in the history
    #[arg(env = "TARGET_URL")]
    pub url: Option<String>,

    /// Number of concurrent workers (1-1000)
    #[arg(short = 't', long, env = "NUM_CONCURRENT_TASKS", default_value_t = 10)]
    pub threads: usize,

    /// Test duration, e.g. 30s, 10m, 1h or bare seconds (max 1h)
    #[arg(short = 'd', long, env = "TEST_DURATION", default_value = "30s", value_parser = parse_duration_string)]
    pub duration: Duration,

    /// HTTP method
    #[arg(short = 'X', long, env = "REQUEST_TYPE", default_value = "GET")]
    pub method: String,

    /// Request body, ignored for GET and HEAD
    #[arg(short = 'b', long, env = "REQUEST_BODY")]
    pub body: Option<String>,

    /// Content type of the request body
    #[arg(long, env = "CONTENT_TYPE", default_value = DEFAULT_CONTENT_TYPE)]
    pub content_type: String,

    /// Query parameters as k1=v1&k2=v2
    #[arg(short = 'q', long, env = "QUERY_PARAMS")]
    pub query: Option<String>,

    /// Per-request timeout
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "15s", value_parser = parse_duration_string)]
    pub timeout: Duration,

    /// Retries for transient failures (0-10)
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Extra headers as Name:Value pairs separated by commas (\, escapes a comma)
    #[arg(short = 'H', long, env = "CUSTOM_HEADERS")]
    pub headers: Option<String>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long, env = "SKIP_TLS_VERIFY")]
    pub skip_tls_verify: bool,

    /// DNS override as hostname:ip:port
    #[arg(long, env = "RESOLVE_TARGET_ADDR")]
    pub resolve: Option<String>,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Export file or directory
    #[arg(short = 'o', long, env = "EXPORT_PATH")]
    pub export_path: Option<PathBuf>,

    /// Export format
    #[arg(long, env = "EXPORT_FORMAT", value_enum, default_value_t = ExportFormat::Text)]
    pub export_format: ExportFormat,

    /// Do not write an export file
    #[arg(long)]
    pub no_export: bool,

    /// URL history file
    #[arg(long, env = "HISTORY_FILE")]
    pub history_file: Option<PathBuf>,

    /// Print the URL history and exit
    #[arg(long)]
    pub list_history: bool,
}

/// Where and how results are exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub path: Option<PathBuf>,
    pub format: ExportFormat,
}

impl Args {
    /// Explicit URL, or the most recent one from `history`.
    pub fn target_url(&self, history: &UrlHistory) -> Option<String> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .or_else(|| history.recent().first().cloned())
    }

    /// Builds and validates the load test configuration for `url`.
    pub fn load_test_config(&self, url: &str) -> ValidationResult<LoadTestConfig> {
        let mut builder = LoadTestConfig::builder(url)
            .threads(self.threads)
            .duration(self.duration)
            .request_timeout(self.timeout)
            .max_retries(self.max_retries)
            .method(self.method.as_str())
            .content_type(self.content_type.as_str());

        if let Some(ref query) = self.query {
            builder = builder.query_params(parse_query_string(query));
        }
        if let Some(ref body) = self.body {
            builder = builder.body(body.as_str());
        }
        builder.build()
    }

    /// Client settings; the idle pool holds one connection per worker.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.timeout,
            max_idle_per_host: self.threads.max(1),
            skip_tls_verify: self.skip_tls_verify,
            resolve_target_addr: self.resolve.clone(),
            custom_headers: self.headers.clone(),
        }
    }

    pub fn export_settings(&self) -> Option<ExportSettings> {
        if self.no_export {
            return None;
        }
        Some(ExportSettings {
            path: self.export_path.clone(),
            format: self.export_format,
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(default_history_path)
    }
}

/// Error returned when no URL was given and the history is empty.
pub fn missing_url_error() -> ValidationError {
    ValidationError::FieldError {
        field: "url".to_string(),
        message: "No target URL given and the URL history is empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("api-pulse").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_build_config() {
        let args = parse(&[
            "http://localhost:8080/items",
            "-t",
            "4",
            "-d",
            "2m",
            "-X",
            "post",
            "-b",
            "{}",
            "-q",
            "page=2&size=10",
            "--timeout",
            "5s",
        ]);

        let config = args.load_test_config(args.url.as_deref().unwrap()).unwrap();
        assert_eq!(config.thread_count, 4);
        assert_eq!(config.duration, Duration::from_secs(120));
        assert_eq!(config.method, reqwest::Method::POST);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.query_params.get("size").map(String::as_str), Some("10"));
        assert!(config.sends_body());
    }

    #[test]
    fn invalid_duration_is_rejected_by_parser() {
        let result =
            Args::try_parse_from(["api-pulse", "http://localhost", "--duration", "5 weeks"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_export_disables_export() {
        let args = parse(&["http://localhost", "--no-export"]);
        assert_eq!(args.export_settings(), None);

        let args = parse(&["http://localhost", "--export-format", "json", "-o", "/tmp"]);
        assert_eq!(
            args.export_settings(),
            Some(ExportSettings {
                path: Some(PathBuf::from("/tmp")),
                format: ExportFormat::Json,
            })
        );
    }

    #[test]
    fn url_falls_back_to_history() {
        let mut history = UrlHistory::new("unused.json");
        history.add("http://recent.example.com/");

        let args = parse(&["--threads", "2"]);
        assert_eq!(
            args.target_url(&history).as_deref(),
            Some("http://recent.example.com/")
        );

        let args = parse(&["http://explicit.example.com/"]);
        assert_eq!(
            args.target_url(&history).as_deref(),
            Some("http://explicit.example.com/")
        );
    }
}
