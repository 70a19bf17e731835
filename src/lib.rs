/* src/lib.rs */
//! # ipgate
//!
//! Admit HTTP requests only from client IPs inside a configured allowlist of
//! CIDR ranges.
//!
//! The client IP is the first entry of the `X-Forwarded-For` header when that
//! header is present, and the transport-level remote address otherwise.
//! Malformed address data is rejected with `500`, an address outside every
//! range with `403`. An empty allowlist admits everyone.
//!
//! ## Features
//!
//! - Framework-free decision via [`IpFilter::check`]
//! - Axum/tower middleware via the `axum` feature (on by default)
//! - Typed environment variable accessors in [`env`] for loading the
//!   allowlist and the rest of a service's configuration
//!
//! ## Examples
//!
//! ```rust
//! use ipgate::{IpFilter, IpFilterConfig};
//!
//! let filter = IpFilter::new(IpFilterConfig::parse(["192.168.1.0/24"]).unwrap());
//!
//! let ip = filter.check(Some("192.168.1.125, 10.0.0.1"), None).unwrap();
//! assert_eq!(ip, "192.168.1.125".parse::<std::net::IpAddr>().unwrap());
//!
//! // no header, so the remote address decides
//! assert!(filter.check(None, Some("192.168.2.1:53422")).is_err());
//! ```

pub mod env;
pub mod error;
pub mod extractor;
pub mod filter;

#[cfg(feature = "axum")]
pub mod middleware;

pub use error::{EnvError, FilterError, InvalidRange, Result};
pub use extractor::{DEFAULT_FORWARDED_HEADER, HeaderMap, IpExtractor};
pub use filter::{IpFilter, IpFilterConfig};

#[cfg(feature = "axum")]
pub use middleware::{IpFilterLayer, IpFilterService, RemoteAddr};

/// Re-export commonly used types
pub use ipnet::IpNet;
pub use std::net::IpAddr;
