// src/error.rs

//! Unified error handling for the proxy.

use std::fmt;

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Maximum number of characters of an upstream body kept in an error.
const BODY_SNIPPET_LEN: usize = 300;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (transport, timeout, decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Upstream body did not have the expected envelope shape
    #[error("Malformed upstream envelope: {0}")]
    Envelope(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an upstream status error, keeping only a snippet of the body.
    pub fn upstream(status: u16, body: impl AsRef<str>) -> Self {
        let body: String = body.as_ref().chars().take(BODY_SNIPPET_LEN).collect();
        Self::Upstream { status, body }
    }

    /// Create a malformed-envelope error.
    pub fn envelope(message: impl fmt::Display) -> Self {
        Self::Envelope(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_body_is_truncated() {
        let body = "x".repeat(1_000);
        match AppError::upstream(502, &body) {
            AppError::Upstream { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), BODY_SNIPPET_LEN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn display_includes_status() {
        let err = AppError::upstream(404, "not here");
        assert_eq!(err.to_string(), "Upstream returned status 404: not here");
    }
}
