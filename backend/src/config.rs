//! Application configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present) and fall back to the defaults below. CLI flags override them.
//!
//! | Variable                 | Default                                       |
//! |--------------------------|-----------------------------------------------|
//! | `FIELDMAP_ENDPOINT`      | `https://jsonplaceholder.typicode.com/posts`  |
//! | `FIELDMAP_TIMEOUT_SECS`  | `30`                                          |
//! | `FIELDMAP_PORT`          | `3000`                                        |
//! | `FIELDMAP_MAX_FILE_SIZE` | `52428800` (50 MB)                            |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Submission endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";

/// Outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum file size for import (in bytes).
///
/// 50 MB limit.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub port: u16,
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let endpoint = lookup("FIELDMAP_ENDPOINT").unwrap_or(defaults.endpoint);
        validate_endpoint(&endpoint)?;

        let timeout_secs = parse_var(&lookup, "FIELDMAP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            endpoint,
            request_timeout: Duration::from_secs(timeout_secs),
            port: parse_var(&lookup, "FIELDMAP_PORT", defaults.port)?,
            max_file_size: parse_var(&lookup, "FIELDMAP_MAX_FILE_SIZE", defaults.max_file_size)?,
        })
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint)?;
        self.endpoint = endpoint;
        Ok(self)
    }

    /// Override the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Endpoint must be an absolute http or https URL.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidEndpoint {
        url: endpoint.to_string(),
        message,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("FIELDMAP_ENDPOINT", "http://localhost:8080/users"),
            ("FIELDMAP_TIMEOUT_SECS", "5"),
            ("FIELDMAP_PORT", " 4000 "),
            ("FIELDMAP_MAX_FILE_SIZE", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:8080/users");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup_from(&[("FIELDMAP_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FIELDMAP_PORT"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = Config::from_lookup(lookup_from(&[("FIELDMAP_ENDPOINT", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));

        assert!(Config::default().with_endpoint("mailto:a@b.co").is_err());
    }
}
