//! Error types and failure categorization.
//!
//! Per-request failures are classified into [`ErrorCategory`] values used for
//! retry decisions and metric labels. They are recorded, never propagated.
//! [`LoadTestError`] covers the failures that do reach the caller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_validation::ValidationError;
use crate::load_test::LoadTestReport;

/// Categories of failures that can occur while generating load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 4xx errors (client errors)
    ClientError,

    /// HTTP 5xx errors (server errors)
    ServerError,

    /// Network connectivity errors (DNS, connection refused, etc.)
    NetworkError,

    /// Request timeout errors
    TimeoutError,

    /// TLS/SSL certificate errors
    TlsError,

    /// Other/unknown errors
    OtherError,
}

impl ErrorCategory {
    /// Categorize an HTTP status code.
    ///
    /// Returns None for 2xx responses; every other status is a failure.
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            200..=299 => None,
            400..=499 => Some(ErrorCategory::ClientError),
            500..=599 => Some(ErrorCategory::ServerError),
            _ => Some(ErrorCategory::OtherError),
        }
    }

    /// Categorize a reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ErrorCategory::TimeoutError
        } else if error.is_connect() || error.is_request() || error.is_body() || error.is_decode()
        {
            Self::from_message(&error.to_string()).unwrap_or(ErrorCategory::NetworkError)
        } else if error.is_redirect() {
            ErrorCategory::ClientError
        } else {
            Self::from_message(&error.to_string()).unwrap_or(ErrorCategory::OtherError)
        }
    }

    fn from_message(message: &str) -> Option<Self> {
        let error_msg = message.to_lowercase();

        if error_msg.contains("certificate") || error_msg.contains("tls") || error_msg.contains("ssl")
        {
            Some(ErrorCategory::TlsError)
        } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
            Some(ErrorCategory::TimeoutError)
        } else if error_msg.contains("dns")
            || error_msg.contains("resolve")
            || error_msg.contains("connect")
        {
            Some(ErrorCategory::NetworkError)
        } else {
            None
        }
    }

    /// Whether a failure of this category is worth retrying.
    ///
    /// Timeouts, TLS failures and 4xx responses are not retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCategory::ServerError | ErrorCategory::NetworkError | ErrorCategory::OtherError
        )
    }

    /// Get the Prometheus label for this error category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::TlsError => "tls_error",
            ErrorCategory::OtherError => "other_error",
        }
    }

    /// Get a human-readable description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "HTTP 4xx Client Errors",
            ErrorCategory::ServerError => "HTTP 5xx Server Errors",
            ErrorCategory::NetworkError => "Network/Connection Errors",
            ErrorCategory::TimeoutError => "Request Timeout Errors",
            ErrorCategory::TlsError => "TLS/SSL Certificate Errors",
            ErrorCategory::OtherError => "Other/Unknown Errors",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A single attempt that failed before an HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub category: ErrorCategory,
    pub message: String,
}

impl TransportError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        Self::new(ErrorCategory::from_reqwest_error(error), error.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        self.category == ErrorCategory::TimeoutError
    }
}

/// Failures surfaced to the caller of a load test.
#[derive(Error, Debug)]
pub enum LoadTestError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// A worker or the progress task panicked. `report` holds whatever
    /// was recorded before the run finished draining.
    #[error("Load test task failed: {source}")]
    Task {
        #[source]
        source: tokio::task::JoinError,
        report: Option<Box<LoadTestReport>>,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("A load test is already running")]
    AlreadyRunning,
}

impl LoadTestError {
    /// Statistics gathered by a run that failed after it finished draining.
    pub fn partial_report(&self) -> Option<&LoadTestReport> {
        match self {
            LoadTestError::Task { report, .. } => report.as_deref(),
            _ => None,
        }
    }
}

/// Helper to name common HTTP status codes for display.
pub fn status_code_name(status_code: u16) -> &'static str {
    match status_code {
        0 => "No Response",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_success_codes() {
        assert_eq!(ErrorCategory::from_status_code(200), None);
        assert_eq!(ErrorCategory::from_status_code(201), None);
        assert_eq!(ErrorCategory::from_status_code(204), None);
    }

    #[test]
    fn test_redirects_are_failures() {
        assert_eq!(
            ErrorCategory::from_status_code(302),
            Some(ErrorCategory::OtherError)
        );
    }

    #[test]
    fn test_categorize_4xx_and_5xx() {
        assert_eq!(
            ErrorCategory::from_status_code(404),
            Some(ErrorCategory::ClientError)
        );
        assert_eq!(
            ErrorCategory::from_status_code(503),
            Some(ErrorCategory::ServerError)
        );
    }

    #[test]
    fn test_transient_categories() {
        assert!(ErrorCategory::ServerError.is_transient());
        assert!(ErrorCategory::NetworkError.is_transient());
        assert!(!ErrorCategory::TimeoutError.is_transient());
        assert!(!ErrorCategory::ClientError.is_transient());
        assert!(!ErrorCategory::TlsError.is_transient());
    }

    #[test]
    fn test_message_heuristics() {
        assert_eq!(
            ErrorCategory::from_message("invalid peer certificate"),
            Some(ErrorCategory::TlsError)
        );
        assert_eq!(
            ErrorCategory::from_message("operation timed out"),
            Some(ErrorCategory::TimeoutError)
        );
        assert_eq!(ErrorCategory::from_message("something odd"), None);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new(ErrorCategory::NetworkError, "connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_timeout());
        assert!(TransportError::new(ErrorCategory::TimeoutError, "slow").is_timeout());
    }

    #[test]
    fn test_error_category_labels() {
        assert_eq!(ErrorCategory::ClientError.label(), "client_error");
        assert_eq!(ErrorCategory::TimeoutError.label(), "timeout_error");
        assert!(ErrorCategory::ServerError.to_string().contains("5xx"));
    }

    #[test]
    fn test_status_code_names() {
        assert_eq!(status_code_name(0), "No Response");
        assert_eq!(status_code_name(404), "Not Found");
        assert_eq!(status_code_name(599), "Unknown Status");
    }
}
