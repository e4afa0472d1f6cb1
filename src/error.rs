//! Error types for sl-export
//!
//! This module provides the error taxonomy used throughout the crate:
//! - HTTP-level failures carrying the status code and a truncated body
//! - Transport failures (connection, timeout) surfaced from `reqwest`
//! - Local I/O and CSV write failures from the export routines
//! - Configuration errors with the offending key

use thiserror::Error;

/// Result type alias for sl-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of characters of a response body kept for diagnostics
pub const MAX_BODY_SNIPPET: usize = 1000;

/// Main error type for sl-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// The Service Layer answered with an error status
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// The URL that was requested
        url: String,
        /// Response body, truncated to [`MAX_BODY_SNIPPET`] characters
        body: String,
    },

    /// Login against the Service Layer was rejected
    #[error("login failed with HTTP {status}: {body}")]
    Login {
        /// Response status code
        status: u16,
        /// Response body, truncated to [`MAX_BODY_SNIPPET`] characters
        body: String,
    },

    /// Network error (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A URL could not be built or resolved against the base address
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body was not the JSON we expected
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an [`Error::Http`], truncating the body for diagnostics
    pub fn http(status: u16, url: impl Into<String>, body: &str) -> Self {
        Error::Http {
            status,
            url: url.into(),
            body: truncate_body(body),
        }
    }

    /// Build a configuration error for the given key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } | Error::Login { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Truncate a response body to at most [`MAX_BODY_SNIPPET`] characters
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_SNIPPET) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}
