//! Error types for the HTTP sources.

use thiserror::Error;
use urbanflow_core::SourceError;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The API answered with a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The body could not be decoded into the expected records.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The body was valid JSON but not a list of records.
    #[error("Unexpected response shape: expected a JSON array, got {0}")]
    UnexpectedShape(&'static str),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The HTTP client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<AdapterError> for SourceError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Timeout => SourceError::Timeout,
            AdapterError::Parse(_) | AdapterError::UnexpectedShape(_) => {
                SourceError::Malformed(err.to_string())
            }
            AdapterError::Http(_) | AdapterError::Connection(_) | AdapterError::Config(_) => {
                SourceError::Transport(err.to_string())
            }
        }
    }
}
