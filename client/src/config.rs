//! Client configuration
//!
//! Configuration is plain data with serde support, sensible defaults and a
//! `validate()` step. Values can be loaded from a TOML document or overridden
//! from environment variables.
//!
//! # Example
//!
//! ```no_run
//! use eventstreams_client::config::ClientConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! println!("Streaming from {}", config.base_url);
//! println!("Retry ceiling: {}", config.backoff.max_retries);
//! # Ok(())
//! # }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Public stream gateway, without any stream name
pub const DEFAULT_BASE_URL: &str = "https://stream.wikimedia.org/v2/stream";

/// Default `User-Agent` sent with every stream request
pub const DEFAULT_USER_AGENT: &str = concat!("eventstreams-client/", env!("CARGO_PKG_VERSION"));

/// Backoff and retry budget for reconnects
///
/// # Default Values
///
/// - `min_delay_ms`: 100
/// - `max_delay_ms`: 10 seconds
/// - `factor`: 2.0
/// - `max_retries`: 3
/// - `reset_window_secs`: 10 minutes
///
/// The upstream gateway drops every connection after a fixed interval, so a
/// failure that comes long after the last delivered message resets the
/// attempt counter instead of spending the retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first reconnect, in milliseconds
    pub min_delay_ms: u64,
    /// Upper bound for any reconnect delay, in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt
    pub factor: f64,
    /// Consecutive failures tolerated before giving up
    pub max_retries: u32,
    /// Quiet period after which the attempt counter starts over, in seconds
    pub reset_window_secs: u64,
}

impl BackoffConfig {
    /// Validate backoff configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Validation(
                "min_delay_ms must be <= max_delay_ms".to_string(),
            ));
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::Validation(
                "factor must be a finite number >= 1.0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Validation("max_retries must be > 0".to_string()));
        }
        Ok(())
    }

    /// Get minimum delay as Duration
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Get maximum delay as Duration
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Get reset window as Duration
    #[must_use]
    pub const fn reset_window(&self) -> Duration {
        Duration::from_secs(self.reset_window_secs)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 10_000,
            factor: 2.0,
            max_retries: 3,
            reset_window_secs: 600,
        }
    }
}

/// Event stream client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Stream gateway address, without a stream name
    pub base_url: String,
    /// `User-Agent` header value
    pub user_agent: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Reconnect policy
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    /// Load defaults, then apply environment overrides.
    ///
    /// Recognized variables: `EVENTSTREAMS_URL`, `EVENTSTREAMS_USER_AGENT`,
    /// `EVENTSTREAMS_MAX_RETRIES` and `EVENTSTREAMS_RESET_WINDOW_SECS`.
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or the result is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed or the result is invalid
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("base_url cannot be empty".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_secs must be > 0".to_string(),
            ));
        }
        self.backoff.validate()
    }

    /// Get connect timeout as Duration
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup("EVENTSTREAMS_URL") {
            self.base_url = url;
        }
        if let Some(agent) = lookup("EVENTSTREAMS_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(value) = lookup("EVENTSTREAMS_MAX_RETRIES") {
            self.backoff.max_retries = parse_var("EVENTSTREAMS_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("EVENTSTREAMS_RESET_WINDOW_SECS") {
            self.backoff.reset_window_secs = parse_var("EVENTSTREAMS_RESET_WINDOW_SECS", &value)?;
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 30,
            backoff: BackoffConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        value: value.to_string(),
    })
}
