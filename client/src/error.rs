//! Error types for the event stream client

use thiserror::Error;

/// Errors that can occur while subscribing to an event stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// The base address or stream name does not form a valid URL
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Client configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP request could not be sent
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Server answered with a non-success status
    #[error("Stream endpoint returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Connection broke while reading the event stream
    #[error("Stream failed: {0}")]
    StreamFailed(String),

    /// A single message payload could not be decoded
    #[error("Failed to decode event payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StreamError {
    /// Whether the reconnection loop should back off and retry after this error.
    ///
    /// Transport failures are retryable. Configuration and URL errors are
    /// fatal: retrying cannot fix them.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::Status { .. } | Self::StreamFailed(_)
        )
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err.to_string())
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds a value that cannot be parsed
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(StreamError::RequestFailed("refused".into()).is_retryable());
        assert!(StreamError::StreamFailed("reset".into()).is_retryable());
        assert!(StreamError::Status {
            status: 503,
            message: String::new(),
        }
        .is_retryable());
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(!StreamError::InvalidUrl("nope".into()).is_retryable());
        assert!(!StreamError::Config(ConfigError::Validation("bad".into())).is_retryable());
    }

    #[test]
    fn test_status_error_display() {
        let err = StreamError::Status {
            status: 404,
            message: "unknown stream".into(),
        };
        assert_eq!(
            err.to_string(),
            "Stream endpoint returned status 404: unknown stream"
        );
    }
}
