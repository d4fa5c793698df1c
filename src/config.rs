//! Configuration management for tlsgrade.
//!
//! Configuration is built once at the CLI boundary (defaults, then
//! environment variables, then command-line flags) and handed by value to
//! the library. The polling core never reads the environment itself.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::errors::TlsGradeError;
use crate::poll::PollConfig;
use crate::request::{DEFAULT_API_ENDPOINT, RequestBuilder};

/// Main configuration structure for tlsgrade.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,

    /// Poll loop timing and budget
    pub polling: PollConfig,

    /// Where artifacts are written
    pub output: OutputConfig,
}

/// Remote API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Analysis endpoint URL
    pub endpoint: String,

    /// Timeout for one HTTP request, body included
    pub request_timeout: Duration,

    /// Timeout for establishing the connection
    pub connect_timeout: Duration,

    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Directory receiving `<host>_report.json` in detailed mode
    pub report_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("json_results"),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("TLSGRADE_API_URL")
            && !endpoint.trim().is_empty()
        {
            config.api.endpoint = endpoint.trim().to_string();
        }

        if let Ok(timeout) = std::env::var("TLSGRADE_REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = timeout.parse::<u64>()
        {
            config.api.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(interval) = std::env::var("TLSGRADE_POLL_INTERVAL_SECS")
            && let Ok(secs) = interval.parse::<u64>()
        {
            config.polling.poll_interval = Duration::from_secs(secs);
        }

        if let Ok(max_wait) = std::env::var("TLSGRADE_MAX_WAIT_SECS")
            && let Ok(secs) = max_wait.parse::<u64>()
        {
            config.polling.max_total_duration = Some(Duration::from_secs(secs));
        }

        if let Ok(dir) = std::env::var("TLSGRADE_REPORT_DIR")
            && !dir.trim().is_empty()
        {
            config.output.report_dir = PathBuf::from(dir);
        }

        config
    }

    /// Merge with CLI arguments, giving CLI precedence
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(ref endpoint) = cli.api_url {
            self.api.endpoint = endpoint.clone();
        }

        if let Some(ref dir) = cli.output_dir {
            self.output.report_dir = dir.clone();
        }

        if let Some(secs) = cli.max_wait {
            self.polling.max_total_duration = Some(Duration::from_secs(secs));
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "api.request_timeout".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.polling.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_attempts".to_string(),
                value: "0".to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }

        if self.polling.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "polling.poll_interval".to_string(),
                value: "0".to_string(),
                reason: "Poll interval must be greater than 0".to_string(),
            });
        }

        if self.polling.retry_backoff.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "polling.retry_backoff".to_string(),
                value: "0".to_string(),
                reason: "Retry backoff must be greater than 0".to_string(),
            });
        }

        if let Some(max) = self.polling.max_total_duration
            && max.is_zero()
        {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_total_duration".to_string(),
                value: "0".to_string(),
                reason: "Maximum wait must be greater than 0".to_string(),
            });
        }

        if let Err(e) = RequestBuilder::new(&self.api.endpoint) {
            return Err(ConfigError::InvalidValue {
                field: "api.endpoint".to_string(),
                value: self.api.endpoint.clone(),
                reason: e.to_string(),
            });
        }

        if self.output.report_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "output.report_dir".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Missing required configuration
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },
}

impl From<ConfigError> for TlsGradeError {
    fn from(e: ConfigError) -> Self {
        TlsGradeError::configuration(e.to_string())
    }
}
