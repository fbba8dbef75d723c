//! Environment lookup shared by the `from_env` constructors.
use std::env;
use std::str::FromStr;

use crate::errors::GenerationError;

/// Returns the trimmed value of `key`, or `None` when unset or blank.
pub(crate) fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `key` when set. A value that does not parse is a config error
/// rather than a silent fallback to the default.
pub(crate) fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, GenerationError>
where
    T::Err: std::fmt::Display,
{
    match env_value(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| GenerationError::config(format!("invalid {key}={raw:?}: {e}"))),
        None => Ok(None),
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
