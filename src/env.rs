/* src/env.rs */

//! Typed environment variable accessors.
//!
//! Every `*_or` function returns the supplied default when the variable is
//! unset or empty, and an [`EnvError::Invalid`] naming the variable and the
//! expected type when the value does not parse. The `required_*` variants
//! return [`EnvError::Missing`] instead of defaulting.

use std::env;
use std::time::Duration;

use ipnet::IpNet;

use crate::error::EnvError;

const INT: &str = "an int";
const BOOL: &str = "a bool";
const DURATION: &str = "a duration";
const IP_NETS: &str = "a slice of CIDR addresses";

/// Get a variable, or `default` when it is unset.
pub fn var_or(name: &str, default: &str) -> String {
    lookup(name).unwrap_or_else(|| default.to_string())
}

/// Get a variable that must be set.
pub fn var(name: &str) -> Result<String, EnvError> {
    lookup(name).ok_or_else(|| missing(name))
}

/// Get a comma-separated list; blank entries are dropped.
pub fn string_list_or(name: &str, default: Vec<String>) -> Vec<String> {
    match lookup(name) {
        Some(value) => split_list(&value).map(str::to_string).collect(),
        None => default,
    }
}

/// Get a comma-separated list that must be set and hold at least one entry.
pub fn required_string_list(name: &str) -> Result<Vec<String>, EnvError> {
    let list: Vec<String> = split_list(&var(name)?).map(str::to_string).collect();
    if list.is_empty() {
        return Err(missing(name));
    }
    Ok(list)
}

pub fn int_or(name: &str, default: i64) -> Result<i64, EnvError> {
    Ok(parsed(name, INT, |v| v.parse().ok())?.unwrap_or(default))
}

pub fn required_int(name: &str) -> Result<i64, EnvError> {
    parsed(name, INT, |v| v.parse().ok())?.ok_or_else(|| missing(name))
}

pub fn bool_or(name: &str, default: bool) -> Result<bool, EnvError> {
    Ok(parsed(name, BOOL, parse_bool)?.unwrap_or(default))
}

pub fn required_bool(name: &str) -> Result<bool, EnvError> {
    parsed(name, BOOL, parse_bool)?.ok_or_else(|| missing(name))
}

/// Durations use humantime syntax, e.g. `20s` or `1h 30m`.
pub fn duration_or(name: &str, default: Duration) -> Result<Duration, EnvError> {
    Ok(parsed(name, DURATION, |v| humantime::parse_duration(v).ok())?.unwrap_or(default))
}

pub fn required_duration(name: &str) -> Result<Duration, EnvError> {
    parsed(name, DURATION, |v| humantime::parse_duration(v).ok())?.ok_or_else(|| missing(name))
}

/// Get a comma-separated list of CIDR ranges. Host bits are cleared, so
/// `10.1.2.3/8` reads as `10.0.0.0/8`.
pub fn ip_nets_or(name: &str, default: Vec<IpNet>) -> Result<Vec<IpNet>, EnvError> {
    Ok(parsed(name, IP_NETS, parse_ip_nets)?.unwrap_or(default))
}

pub fn required_ip_nets(name: &str) -> Result<Vec<IpNet>, EnvError> {
    parsed(name, IP_NETS, parse_ip_nets)?.ok_or_else(|| missing(name))
}

fn lookup(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parsed<T>(
    name: &str,
    expected: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, EnvError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match parse(value.trim()) {
        Some(parsed) => Ok(Some(parsed)),
        None => Err(EnvError::Invalid {
            name: name.to_string(),
            value,
            expected,
        }),
    }
}

fn missing(name: &str) -> EnvError {
    EnvError::Missing {
        name: name.to_string(),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_ip_net(value: &str) -> Option<IpNet> {
    value.parse::<IpNet>().ok().map(|net| net.trunc())
}

fn parse_ip_nets(value: &str) -> Option<Vec<IpNet>> {
    split_list(value).map(parse_ip_net).collect()
}
