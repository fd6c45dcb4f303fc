//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The endpoint did not pass every probe (`detect --strict`)
    #[error("Relay detected at {endpoint}")]
    RelayDetected {
        /// Endpoint that failed
        endpoint: String,
    },

    /// HTTP API server error
    #[error("Server error: {message}")]
    Server {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Relayscope library error
    #[error("Relayscope error: {0}")]
    Relayscope(#[from] relayscope::RelayscopeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a relay-detected error
    #[must_use]
    pub fn relay_detected(endpoint: impl Into<String>) -> Self {
        Self::RelayDetected {
            endpoint: endpoint.into(),
        }
    }

    /// Create a server error
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}
