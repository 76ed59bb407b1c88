//! Environment variable helpers shared by the `from_env` constructors.

use std::str::FromStr;

use gatekeep_core::ConfigError;

/// Parse an optional environment variable.
///
/// Unset is `Ok(None)`; a value that does not parse is an error naming the variable.
pub fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Read a boolean flag where anything but `false`/`0` counts as enabled.
pub fn flag_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}
