//! Error types for urlsift

use thiserror::Error;

/// Errors that can occur while fetching or extracting a URL
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Input could not be parsed as an absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// DNS or connection failure
    #[error("Failed to reach server: {0}")]
    Unreachable(String),

    /// Server answered with a non-2xx status
    #[error("Request failed with status {code} {reason}")]
    HttpStatus { code: u16, reason: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Video URL without an extractable identifier
    #[error("Malformed video URL: {0}")]
    MalformedUrl(String),

    /// No extractor is registered for the resource
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Format-specific parse failure
    #[error("Failed to decode {format}: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    /// Transcript lookup failure
    #[error("Transcript unavailable: {0}")]
    Transcript(String),

    /// Video probing failure
    #[error("Video probe failed: {0}")]
    Probe(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

impl ProcessError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProcessError::Timeout
        } else if err.is_connect() {
            ProcessError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            ProcessError::http_status(status.as_u16())
        } else {
            ProcessError::Unreachable(err.to_string())
        }
    }

    /// Build an `HttpStatus` error with the canonical reason phrase
    pub fn http_status(code: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        ProcessError::HttpStatus { code, reason }
    }

    pub(crate) fn decode(format: &'static str, err: impl std::fmt::Display) -> Self {
        ProcessError::Decode {
            format,
            message: err.to_string(),
        }
    }
}
