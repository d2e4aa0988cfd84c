use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::errors::LoadTestError;
use crate::utils::parse_headers_with_escapes;

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("api-pulse/", env!("CARGO_PKG_VERSION"));

/// Configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    /// Idle connections kept per host; one per worker avoids reconnects.
    pub max_idle_per_host: usize,
    pub skip_tls_verify: bool,
    pub resolve_target_addr: Option<String>,
    pub custom_headers: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_idle_per_host: 32,
            skip_tls_verify: false,
            resolve_target_addr: None,
            custom_headers: None,
        }
    }
}

/// Result of building the client, includes parsed headers for logging.
pub struct ClientBuildResult {
    pub client: reqwest::Client,
    pub parsed_headers: HeaderMap,
}

/// Builds a reqwest HTTP client with the specified configuration.
pub fn build_client(config: &ClientConfig) -> Result<ClientBuildResult, LoadTestError> {
    let mut client_builder = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .tcp_keepalive(Duration::from_secs(60));

    if let Some(ref resolve_str) = config.resolve_target_addr {
        if !resolve_str.is_empty() {
            client_builder = configure_dns_override(client_builder, resolve_str)?;
        } else {
            warn!("RESOLVE_TARGET_ADDR is set but empty, no DNS override will be applied");
        }
    }

    let mut parsed_headers = configure_custom_headers(config.custom_headers.as_deref())?;
    if !parsed_headers.contains_key(USER_AGENT) {
        parsed_headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    }
    client_builder = client_builder.default_headers(parsed_headers.clone());

    if config.skip_tls_verify {
        warn!("Skipping TLS certificate verification");
        client_builder = client_builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    let client = client_builder
        .build()
        .map_err(|e| LoadTestError::Client(e.to_string()))?;

    Ok(ClientBuildResult {
        client,
        parsed_headers,
    })
}

fn configure_dns_override(
    client_builder: reqwest::ClientBuilder,
    resolve_str: &str,
) -> Result<reqwest::ClientBuilder, LoadTestError> {
    let parts: Vec<&str> = resolve_str.split(':').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(LoadTestError::Client(format!(
            "RESOLVE_TARGET_ADDR ('{}') is not in the expected format 'hostname:ip:port'",
            resolve_str
        )));
    }

    let (hostname, ip, port_str) = (parts[0], parts[1], parts[2]);
    if hostname.is_empty() || ip.is_empty() || port_str.is_empty() {
        return Err(LoadTestError::Client(format!(
            "RESOLVE_TARGET_ADDR ('{}'): hostname, IP and port must all be non-empty",
            resolve_str
        )));
    }

    let port: u16 = port_str.parse().map_err(|e| {
        LoadTestError::Client(format!(
            "Failed to parse port '{}' in RESOLVE_TARGET_ADDR: {}",
            port_str, e
        ))
    })?;

    let socket_addr: SocketAddr = format!("{}:{}", ip, port).parse().map_err(|e| {
        LoadTestError::Client(format!(
            "Failed to parse '{}:{}' as a socket address for RESOLVE_TARGET_ADDR: {}",
            ip, port, e
        ))
    })?;

    info!(
        hostname = hostname,
        addr = %socket_addr,
        "Configured DNS override"
    );

    Ok(client_builder.resolve(hostname, socket_addr))
}

fn configure_custom_headers(custom_headers_str: Option<&str>) -> Result<HeaderMap, LoadTestError> {
    let mut parsed_headers = HeaderMap::new();

    let headers_str = match custom_headers_str {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(parsed_headers),
    };

    for header_pair_str in parse_headers_with_escapes(headers_str) {
        let header_pair_str = header_pair_str.trim();
        if header_pair_str.is_empty() {
            continue;
        }

        let (name_str, value_str) = header_pair_str.split_once(':').ok_or_else(|| {
            LoadTestError::Client(format!(
                "Invalid header format in CUSTOM_HEADERS: '{}'. Expected 'Name:Value'.",
                header_pair_str
            ))
        })?;

        let name_str = name_str.trim();
        if name_str.is_empty() {
            return Err(LoadTestError::Client(format!(
                "Invalid header format: Header name cannot be empty in '{}'.",
                header_pair_str
            )));
        }

        let header_name = HeaderName::from_str(name_str).map_err(|e| {
            LoadTestError::Client(format!("Invalid header name '{}': {}", name_str, e))
        })?;
        let header_value = HeaderValue::from_str(value_str.trim()).map_err(|e| {
            LoadTestError::Client(format!("Invalid header value for '{}': {}", name_str, e))
        })?;

        parsed_headers.insert(header_name, header_value);
    }

    Ok(parsed_headers)
}
