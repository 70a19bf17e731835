/* src/filter.rs */

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::{debug, warn};

use crate::env;
use crate::error::{EnvError, FilterError, InvalidRange, Result};
use crate::extractor::IpExtractor;

/// Ranges a filter admits. Empty means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpFilterConfig {
    pub allowed_ranges: Vec<IpNet>,
}

impl IpFilterConfig {
    pub fn new(allowed_ranges: Vec<IpNet>) -> Self {
        Self { allowed_ranges }
    }

    /// Parse CIDR strings such as `"192.168.1.0/24"`. Host bits are cleared.
    pub fn parse<I, S>(ranges: I) -> std::result::Result<Self, InvalidRange>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_ranges = ranges
            .into_iter()
            .map(|range| {
                let range = range.as_ref().trim();
                env::parse_ip_net(range).ok_or_else(|| InvalidRange(range.to_string()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { allowed_ranges })
    }

    /// Read a comma-separated CIDR list from the environment variable `name`.
    /// An unset variable gives an unrestricted configuration.
    pub fn from_env(name: &str) -> std::result::Result<Self, EnvError> {
        let allowed_ranges = env::ip_nets_or(name, Vec::new())?;
        debug!(variable = name, ranges = allowed_ranges.len(), "loaded ip allowlist");
        Ok(Self { allowed_ranges })
    }
}

/// Admits a request only when its client IP lies in one of the configured
/// ranges.
///
/// The filter never changes after construction, so one instance can serve
/// any number of concurrent requests.
///
/// # Examples
///
/// ```rust
/// use ipgate::{FilterError, IpFilter, IpFilterConfig};
///
/// let config = IpFilterConfig::parse(["192.168.1.0/24"]).unwrap();
/// let filter = IpFilter::new(config);
///
/// assert!(filter.check(Some("192.168.1.125"), None).is_ok());
/// assert!(matches!(
///     filter.check(Some("192.168.2.125"), None),
///     Err(FilterError::Forbidden(_))
/// ));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IpFilter {
    config: IpFilterConfig,
    extractor: IpExtractor,
}

impl IpFilter {
    pub fn new(config: IpFilterConfig) -> Self {
        Self {
            config,
            extractor: IpExtractor::default(),
        }
    }

    /// Use a custom extractor, e.g. to read a different forwarding header.
    pub fn with_extractor(mut self, extractor: IpExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &IpFilterConfig {
        &self.config
    }

    pub fn extractor(&self) -> &IpExtractor {
        &self.extractor
    }

    /// Whether `ip` may pass. Always true for an empty allowlist.
    pub fn allows(&self, ip: IpAddr) -> bool {
        let ranges = &self.config.allowed_ranges;
        ranges.is_empty() || ranges.iter().any(|net| net.contains(&ip))
    }

    /// Decide on a request given its forwarding header value and remote
    /// address, returning the client IP when it may pass.
    pub fn check(&self, forwarded: Option<&str>, remote_addr: Option<&str>) -> Result<IpAddr> {
        let ip = self.extractor.extract(forwarded, remote_addr).inspect_err(|err| {
            warn!(error = %err, "could not determine client address");
        })?;

        if !self.allows(ip) {
            debug!(client = %ip, "client address not in allowlist");
            return Err(FilterError::Forbidden(ip));
        }
        Ok(ip)
    }
}
