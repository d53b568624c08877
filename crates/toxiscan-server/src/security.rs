//! Security utilities for outbound requests
//!
//! Provides URL validation and SSRF protection for the comment
//! extraction service.

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Security-related errors
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL scheme '{0}' is not allowed, only HTTPS is permitted")]
    InvalidScheme(String),

    #[error("Host '{0}' is blocked: internal/private IP addresses are not allowed")]
    BlockedHost(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Hostnames that are never valid service URLs
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    // Cloud metadata services
    "metadata.google.internal",
    "metadata.goog",
    "169.254.169.254",
    "fd00:ec2::254",
];

/// Configuration for URL validation
#[derive(Debug, Clone, Default)]
pub struct UrlValidationConfig {
    /// Allow HTTP scheme
    pub allow_http: bool,
    /// Allow localhost/loopback addresses
    pub allow_localhost: bool,
    /// Allow private/internal IP ranges (RFC 1918, etc.)
    pub allow_private_ips: bool,
}

impl UrlValidationConfig {
    /// Configuration for a sidecar extraction service on the same host
    pub fn insecure() -> Self {
        Self {
            allow_http: true,
            allow_localhost: true,
            allow_private_ips: true,
        }
    }
}

/// Validate the base URL of an outbound service.
///
/// Rejects non-HTTPS schemes, well-known local and metadata hostnames,
/// loopback, private and link-local addresses unless the config allows them.
/// Link-local addresses are always rejected.
pub fn validate_service_url(url_str: &str, config: &UrlValidationConfig) -> Result<Url, SecurityError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        scheme => return Err(SecurityError::InvalidScheme(scheme.to_string())),
    }

    let host = url.host_str().ok_or(SecurityError::MissingHost)?;
    let host_lower = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();

    if !config.allow_localhost {
        for blocked in BLOCKED_HOSTNAMES {
            if host_lower == *blocked || host_lower.ends_with(&format!(".{}", blocked)) {
                return Err(SecurityError::BlockedHost(host.to_string()));
            }
        }
    }

    if let Ok(ip) = host_lower.parse::<IpAddr>() {
        if !config.allow_localhost && ip.is_loopback() {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }
        if !config.allow_private_ips && is_private_ip(&ip) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }
        if is_link_local(&ip) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }
    }

    Ok(url)
}

/// Private ranges (RFC 1918, RFC 4193, CGNAT)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                // 100.64.0.0/10
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 0.0.0.0/8
                || v4.octets()[0] == 0
        }
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        // 169.254.0.0/16, includes the cloud metadata endpoint
        IpAddr::V4(v4) => v4.octets()[0] == 169 && v4.octets()[1] == 254,
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}
