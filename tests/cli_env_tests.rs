//! Environment variable configuration of the command line.

use std::env;
use std::path::PathBuf;

use clap::Parser;
use serial_test::serial;
use tokio::time::Duration;

use api_pulse::cli::Args;
use api_pulse::config_validation::ValidationError;
use api_pulse::export::ExportFormat;
use api_pulse::history::UrlHistory;

const VARS: [&str; 16] = [
    "TARGET_URL",
    "NUM_CONCURRENT_TASKS",
    "TEST_DURATION",
    "REQUEST_TYPE",
    "REQUEST_BODY",
    "CONTENT_TYPE",
    "QUERY_PARAMS",
    "REQUEST_TIMEOUT",
    "MAX_RETRIES",
    "CUSTOM_HEADERS",
    "SKIP_TLS_VERIFY",
    "RESOLVE_TARGET_ADDR",
    "METRICS_PORT",
    "EXPORT_PATH",
    "EXPORT_FORMAT",
    "HISTORY_FILE",
];

/// Clear every variable the parser reads; test order is not guaranteed.
fn clean_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clean_env();
    let args = Args::try_parse_from(["api-pulse", "http://localhost:8080/"]).unwrap();
    let config = args.load_test_config("http://localhost:8080/").unwrap();

    assert_eq!(config.thread_count, 10);
    assert_eq!(config.duration, Duration::from_secs(30));
    assert_eq!(config.request_timeout, Duration::from_secs(15));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.method, reqwest::Method::GET);
    assert_eq!(config.content_type, "application/json");
    assert!(!args.skip_tls_verify);
    assert_eq!(args.metrics_port, None);
    assert_eq!(args.export_format, ExportFormat::Text);
}

#[test]
#[serial]
fn env_vars_configure_the_run() {
    clean_env();
    env::set_var("TARGET_URL", "https://env.example.com/api");
    env::set_var("NUM_CONCURRENT_TASKS", "25");
    env::set_var("TEST_DURATION", "2m");
    env::set_var("REQUEST_TYPE", "PUT");
    env::set_var("REQUEST_BODY", "{\"id\":1}");
    env::set_var("QUERY_PARAMS", "a=1&b=2&a=3");
    env::set_var("REQUEST_TIMEOUT", "3s");
    env::set_var("MAX_RETRIES", "0");
    env::set_var("SKIP_TLS_VERIFY", "true");
    env::set_var("CUSTOM_HEADERS", "X-Team:load");
    env::set_var("EXPORT_FORMAT", "json");
    env::set_var("HISTORY_FILE", "/tmp/pulse-history.json");

    let args = Args::try_parse_from(["api-pulse"]).unwrap();
    clean_env();

    let url = args.target_url(&UrlHistory::new("unused.json")).unwrap();
    assert_eq!(url, "https://env.example.com/api");

    let config = args.load_test_config(&url).unwrap();
    assert_eq!(config.thread_count, 25);
    assert_eq!(config.duration, Duration::from_secs(120));
    assert_eq!(config.method, reqwest::Method::PUT);
    assert_eq!(config.request_timeout, Duration::from_secs(3));
    assert_eq!(config.max_retries, 0);
    assert_eq!(config.query_params.get("a").map(String::as_str), Some("3"));
    assert_eq!(config.query_params.get("b").map(String::as_str), Some("2"));
    assert!(config.sends_body());

    let client = args.client_config();
    assert!(client.skip_tls_verify);
    assert_eq!(client.max_idle_per_host, 25);
    assert_eq!(client.custom_headers.as_deref(), Some("X-Team:load"));

    assert_eq!(args.export_format, ExportFormat::Json);
    assert_eq!(args.history_path(), PathBuf::from("/tmp/pulse-history.json"));
}

#[test]
#[serial]
fn flags_override_env() {
    clean_env();
    env::set_var("NUM_CONCURRENT_TASKS", "25");

    let args = Args::try_parse_from(["api-pulse", "http://localhost/", "-t", "3"]).unwrap();
    clean_env();

    assert_eq!(args.threads, 3);
}

#[test]
#[serial]
fn out_of_range_values_are_reported_per_field() {
    clean_env();
    let args = Args::try_parse_from([
        "api-pulse",
        "http://localhost/",
        "--threads",
        "5000",
        "--duration",
        "2h",
        "--max-retries",
        "11",
    ])
    .unwrap();

    let err = args.load_test_config("http://localhost/").unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ValidationError::Multiple(_)), "{}", message);
    assert!(message.contains("threads"), "{}", message);
    assert!(message.contains("duration"), "{}", message);
    assert!(message.contains("max_retries"), "{}", message);
}

#[test]
#[serial]
fn bad_url_is_rejected() {
    clean_env();
    let args = Args::try_parse_from(["api-pulse", "ftp://files.example.com/"]).unwrap();
    let err = args.load_test_config("ftp://files.example.com/").unwrap_err();
    assert_eq!(err.field(), Some("url"));
}
