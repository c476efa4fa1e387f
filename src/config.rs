//! Configuration management for fallwatch
//!
//! Settings are loaded from environment variables with sensible defaults and
//! can be overridden by command-line flags.
//!
//! # Environment Variables
//!
//! - `FALLWATCH_SERVER_URL`: Detection service address - default: "http://localhost:5000"
//! - `FALLWATCH_POLL_INTERVAL_MS`: Delay between status checks - default: "1000"
//! - `FALLWATCH_REQUEST_TIMEOUT`: Timeout for JSON calls in seconds - default: "30"
//! - `FALLWATCH_UPLOAD_TIMEOUT`: Timeout for uploads and downloads in seconds - default: "600"
//! - `FALLWATCH_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use fallwatch::ClientConfig;
//! use std::env;
//!
//! env::set_var("FALLWATCH_SERVER_URL", "http://detector.local:5000");
//!
//! let config = ClientConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 600;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Client configuration
///
/// `Default::default()` reads `FALLWATCH_*` environment variables and falls
/// back to built-in defaults for anything missing or unparsable.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the detection service
    pub server_url: String,

    /// Delay between status requests while a detection runs
    pub poll_interval_ms: u64,

    /// Timeout for status, detect, history and tuning requests
    pub request_timeout_secs: u64,

    /// Timeout for video uploads and result downloads
    pub upload_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let server_url = env::var("FALLWATCH_SERVER_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let poll_interval_ms = env_u64("FALLWATCH_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        let request_timeout_secs =
            env_u64("FALLWATCH_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS);
        let upload_timeout_secs = env_u64("FALLWATCH_UPLOAD_TIMEOUT", DEFAULT_UPLOAD_TIMEOUT_SECS);

        let log_level = env::var("FALLWATCH_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            server_url,
            poll_interval_ms,
            request_timeout_secs,
            upload_timeout_secs,
            log_level,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

impl ClientConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "Server URL must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }

        if !(50..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "Poll interval must be between 50ms and 60s".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.upload_timeout_secs == 0 || self.upload_timeout_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Upload timeout must be between 1 second and 1 hour".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();

        map.insert("server_url".to_string(), self.server_url.clone());
        map.insert(
            "poll_interval_ms".to_string(),
            self.poll_interval_ms.to_string(),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "upload_timeout_secs".to_string(),
            self.upload_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

/// Parses a timeout given on the command line, rejecting zero
pub fn parse_positive_secs(field: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::ParseError {
            field: field.to_string(),
            error: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::ParseError {
            field: field.to_string(),
            error: e.to_string(),
        }),
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fallwatch Configuration:")?;
        writeln!(f, "  Server: {}", self.server_url)?;
        writeln!(f, "  Poll Interval: {}ms", self.poll_interval_ms)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Upload Timeout: {}s", self.upload_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
