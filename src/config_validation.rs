//! Configuration validation.
//!
//! Every constraint on a load test configuration is checked here before any
//! worker starts. Each violated constraint yields its own field-level error.

use reqwest::{Method, Url};
use thiserror::Error;

/// Validation error with context about which field failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Field '{field}': value {value} is out of range ({min} to {max})")]
    OutOfRange {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}': invalid format - {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}': invalid enum value '{value}'. Expected one of: {expected}")]
    InvalidEnum {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Multiple validation errors: {0}")]
    Multiple(String),
}

impl ValidationError {
    /// Name of the field that failed, if the error refers to a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::FieldError { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::InvalidEnum { field, .. } => Some(field),
            ValidationError::Multiple(_) => None,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects validation errors so all violations are reported together.
#[derive(Default)]
pub struct ValidationContext {
    errors: Vec<ValidationError>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of a failed check, if any.
    pub fn check(&mut self, result: ValidationResult<()>) {
        if let Err(e) = result {
            self.errors.push(e);
        }
    }

    /// Consume the context and return a result.
    ///
    /// A single error is returned as-is; several are joined into `Multiple`.
    pub fn into_result(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => {
                let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
                Err(ValidationError::Multiple(messages.join("; ")))
            }
        }
    }
}

/// Validator for target URLs.
pub struct UrlValidator;

impl UrlValidator {
    /// Parses `url` and requires an absolute http(s) URL with a host.
    pub fn parse(url: &str) -> ValidationResult<Url> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "url".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        }

        if url.contains(' ') {
            return Err(ValidationError::InvalidFormat {
                field: "url".to_string(),
                message: "URL cannot contain spaces".to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidFormat {
            field: "url".to_string(),
            message: format!("'{}' is not a valid absolute URL: {}", url, e),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidFormat {
                field: "url".to_string(),
                message: format!("URL must start with http:// or https://, got: {}", url),
            });
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidFormat {
                field: "url".to_string(),
                message: format!("URL has no host: {}", url),
            });
        }

        Ok(parsed)
    }
}

/// Validator for numeric ranges.
pub struct RangeValidator;

impl RangeValidator {
    pub fn validate_u64(value: u64, min: u64, max: u64, field: &str) -> ValidationResult<()> {
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }
}

/// Validator for HTTP methods.
pub struct HttpMethodValidator;

impl HttpMethodValidator {
    const VALID_METHODS: &'static [&'static str] =
        &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

    /// Parses a method name case-insensitively.
    pub fn parse(method: &str) -> ValidationResult<Method> {
        let method_upper = method.trim().to_uppercase();
        if !Self::VALID_METHODS.contains(&method_upper.as_str()) {
            return Err(ValidationError::InvalidEnum {
                field: "method".to_string(),
                value: method.to_string(),
                expected: Self::VALID_METHODS.join(", "),
            });
        }

        Method::from_bytes(method_upper.as_bytes()).map_err(|e| ValidationError::InvalidFormat {
            field: "method".to_string(),
            message: e.to_string(),
        })
    }
}

/// Validator for MIME content types.
pub struct ContentTypeValidator;

impl ContentTypeValidator {
    pub fn validate(content_type: &str) -> ValidationResult<()> {
        let content_type = content_type.trim();
        let well_formed = content_type
            .split(';')
            .next()
            .and_then(|essence| essence.split_once('/'))
            .is_some_and(|(kind, sub)| !kind.trim().is_empty() && !sub.trim().is_empty());

        if !well_formed {
            return Err(ValidationError::InvalidFormat {
                field: "content_type".to_string(),
                message: format!("'{}' is not a type/subtype MIME value", content_type),
            });
        }
        Ok(())
    }
}
