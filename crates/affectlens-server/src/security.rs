//! URL validation for server-side fetches
//!
//! Blocks schemes other than HTTP(S) and hosts that resolve to the server's
//! own network: loopback, private ranges, link-local and cloud metadata.

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// URL rejection reasons
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL scheme '{0}' is not allowed")]
    InvalidScheme(String),

    #[error("Host '{0}' is blocked: internal addresses are not allowed")]
    BlockedHost(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Hostnames that always refer to internal services
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    "metadata.google.internal",
    "metadata.goog",
];

/// What a URL may point at
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPolicy {
    pub allow_http: bool,
    /// Permit loopback, private and blocked hostnames
    pub allow_private: bool,
}

/// Parse and check a URL against `policy`
pub fn validate_url(url_str: &str, policy: UrlPolicy) -> Result<Url, SecurityError> {
    let url = Url::parse(url_str.trim())?;
    check_url(&url, policy)?;
    Ok(url)
}

/// Check an already-parsed URL (also applied to every redirect hop)
pub fn check_url(url: &Url, policy: UrlPolicy) -> Result<(), SecurityError> {
    match url.scheme() {
        "https" => {}
        "http" if policy.allow_http => {}
        scheme => return Err(SecurityError::InvalidScheme(scheme.to_string())),
    }

    let host = url.host_str().ok_or(SecurityError::MissingHost)?;
    // IPv6 hosts are bracketed in URLs
    let bare = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = bare.parse::<IpAddr>() {
        return check_ip(ip, policy).map_err(|_| SecurityError::BlockedHost(host.to_string()));
    }

    if !policy.allow_private {
        let host_lower = host.to_lowercase();
        let blocked = BLOCKED_HOSTNAMES
            .iter()
            .any(|b| host_lower == *b || host_lower.ends_with(&format!(".{}", b)));
        if blocked {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }
    }

    Ok(())
}

/// Check a literal or resolved address against `policy`
pub fn check_ip(ip: IpAddr, policy: UrlPolicy) -> Result<(), SecurityError> {
    // IPv4-mapped IPv6 is judged as the IPv4 address
    let ip = ip.to_canonical();
    // Link-local covers the metadata endpoint and is never allowed
    if is_link_local(&ip) {
        return Err(SecurityError::BlockedHost(ip.to_string()));
    }
    if !policy.allow_private && (ip.is_loopback() || ip.is_unspecified() || is_private_ip(&ip)) {
        return Err(SecurityError::BlockedHost(ip.to_string()));
    }
    Ok(())
}

/// RFC 1918, carrier-grade NAT, `0.0.0.0/8` and IPv6 unique-local ranges
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_private() || (octets[0] == 100 && (octets[1] & 0xC0) == 64) || octets[0] == 0
        }
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

fn is_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}
