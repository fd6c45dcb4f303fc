//! Result and error types for Relayscope.
//!
//! Two layers: [`ProbeError`] is probe-local and never escapes a detection
//! cycle, it only ends up as text in a result's error summary.
//! [`RelayscopeError`] covers configuration and lifecycle failures that the
//! caller has to deal with.

use thiserror::Error;

/// Result type for Relayscope operations
pub type RelayscopeResult<T> = Result<T, RelayscopeError>;

/// Maximum number of response-body bytes carried in any error text.
pub const BODY_PREVIEW_LIMIT: usize = 500;

/// Errors that can occur outside a detection cycle
#[derive(Debug, Error)]
pub enum RelayscopeError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Reference tokenizer could not be loaded or failed to encode
    #[error("Tokenizer error: {message}")]
    Tokenizer {
        /// Error message
        message: String,
    },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl RelayscopeError {
    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a tokenizer error
    #[must_use]
    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer {
            message: message.into(),
        }
    }
}

/// Why a probe could not complete its check.
///
/// Distinct from a probe *failing*: a `ProbeError` means the check itself
/// never produced evidence, and the probe outcome is forced to `false`.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Request payload could not be serialized
    #[error("failed to serialize request: {0}")]
    Request(#[source] serde_json::Error),

    /// Connection failure, timeout, or body read failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("API returned status {status}, body: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response body is not the JSON shape of a chat completion
    #[error("failed to decode response: {source}, body: {body}")]
    Decode {
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
        /// Truncated response body
        body: String,
    },

    /// Well-formed response missing a field the probe needs
    #[error("{0}")]
    Malformed(String),
}

impl ProbeError {
    /// Build a status error, truncating the body for diagnostics.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate_body(body),
        }
    }

    /// Build a decode error, truncating the body for diagnostics.
    #[must_use]
    pub fn decode(source: serde_json::Error, body: &str) -> Self {
        Self::Decode {
            source,
            body: truncate_body(body),
        }
    }

    /// Build a probe-logic error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Truncate a response body to [`BODY_PREVIEW_LIMIT`] bytes.
pub fn truncate_body(body: &str) -> String {
    truncate(body, BODY_PREVIEW_LIMIT)
}

/// Truncate a string for display, never splitting a UTF-8 character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_error() {
        let err = RelayscopeError::invalid_config("endpoint is required");
        assert!(err.to_string().contains("Invalid configuration"));
        assert!(err.to_string().contains("endpoint is required"));
    }

    #[test]
    fn test_status_error_truncates_body() {
        let body = "x".repeat(2000);
        let err = ProbeError::status(502, &body);
        let text = err.to_string();
        assert!(text.contains("502"));
        assert!(text.ends_with("..."));
        assert!(text.len() < 600);
    }

    #[test]
    fn test_decode_error_carries_body() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = ProbeError::decode(source, "<html>");
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        let s = "a".repeat(300);
        let t = truncate(&s, 200);
        assert_eq!(t.len(), 203);
        assert!(t.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // each char is 3 bytes; 4 bytes falls inside the second char
        let t = truncate("人工智能", 4);
        assert_eq!(t, "人...");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RelayscopeError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
