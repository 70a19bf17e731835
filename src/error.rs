/* src/error.rs */

use std::net::IpAddr;

use thiserror::Error;

/// Result type alias for request-time filtering.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Reasons a request is turned away before reaching the wrapped service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The forwarding header carried something that is not an IP address.
    #[error("forwarded client address {0:?} is not a valid IP address")]
    InvalidForwardedIp(String),

    /// The transport-level remote address could not be turned into an IP.
    #[error("remote address {0:?} does not contain a valid IP address")]
    InvalidRemoteAddr(String),

    /// The client IP is well formed but outside every allowed range.
    #[error("client address {0} is not in any allowed range")]
    Forbidden(IpAddr),
}

impl FilterError {
    /// Whether the failure stems from malformed address data rather than
    /// from the allowlist itself.
    pub fn is_internal(&self) -> bool {
        !matches!(self, FilterError::Forbidden(_))
    }
}

/// Errors raised while reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// A required variable is unset or empty.
    #[error("value not found for required environment variable {name}")]
    Missing { name: String },

    /// The variable is set but its value does not parse as the wanted type.
    #[error("value {value:?} for environment variable {name} was not parsable as {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: &'static str,
    },
}

/// A configured allowlist entry that is not CIDR notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0:?} is not a valid CIDR range")]
pub struct InvalidRange(pub String);
