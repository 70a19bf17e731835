/* src/extractor.rs */

use std::collections::HashMap;
use std::net::IpAddr;

use crate::error::{FilterError, Result};

/// Type alias for header maps keyed by lowercase header name.
pub type HeaderMap = HashMap<String, String>;

/// Header consulted first when no other name is configured.
pub const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";

/// Resolves the client IP of a request from its forwarding header, falling
/// back to the transport-level remote address.
#[derive(Debug, Clone)]
pub struct IpExtractor {
    /// Forwarding header to read, stored lowercase.
    pub header: String,
}

impl Default for IpExtractor {
    fn default() -> Self {
        Self {
            header: DEFAULT_FORWARDED_HEADER.to_string(),
        }
    }
}

impl IpExtractor {
    /// Create an extractor reading `X-Forwarded-For`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the forwarding header to read.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into().to_lowercase();
        self
    }

    /// Resolve the client IP.
    ///
    /// A non-blank forwarding header decides: its first entry must be an IP,
    /// and a malformed or empty entry is an error rather than a reason to look
    /// at the remote address. Only an absent or blank header falls through to
    /// `remote_addr`, which must be in `host:port` form.
    pub fn extract(&self, forwarded: Option<&str>, remote_addr: Option<&str>) -> Result<IpAddr> {
        if let Some(value) = forwarded.filter(|v| !v.trim().is_empty()) {
            let candidate = first_forwarded(value);
            return candidate
                .parse::<IpAddr>()
                .map_err(|_| FilterError::InvalidForwardedIp(candidate.to_string()));
        }

        let remote_addr = remote_addr.unwrap_or_default();
        split_host_port(remote_addr)
            .and_then(|host| host.parse::<IpAddr>().ok())
            .ok_or_else(|| FilterError::InvalidRemoteAddr(remote_addr.to_string()))
    }

    /// Same as [`extract`](Self::extract), looking the header up in a plain
    /// map with lowercase keys.
    pub fn extract_from_map(&self, headers: &HeaderMap, remote_addr: Option<&str>) -> Result<IpAddr> {
        self.extract(headers.get(&self.header).map(String::as_str), remote_addr)
    }
}

/// First address of a `client, proxy1, proxy2` chain.
fn first_forwarded(value: &str) -> &str {
    value.split(',').next().map(str::trim).unwrap_or_default()
}

/// Host part of `host:port` or `[v6-host]:port`.
fn split_host_port(addr: &str) -> Option<&str> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        tail.strip_prefix(':')?;
        return Some(host);
    }

    let (host, _port) = addr.rsplit_once(':')?;
    // a bare IPv6 address has more than one colon and no port
    if host.contains(':') {
        return None;
    }
    Some(host)
}
