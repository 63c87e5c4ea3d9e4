//! Network transport
//!
//! One GET per call, no retries. Failures are normalized into
//! [`ProcessError`] variants so callers never see raw reqwest errors.

use crate::error::ProcessError;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves raw bytes for a URL
///
/// Implementations must be safe to call concurrently and keep no
/// per-call mutable state.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body at `url`
    ///
    /// Fails with `Unreachable`, `HttpStatus` (non-2xx) or `Timeout`.
    async fn get(&self, url: &str) -> Result<Bytes, ProcessError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport sending `user_agent` with the given timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ProcessError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ProcessError::ClientBuild)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Bytes, ProcessError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProcessError::from_reqwest)?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "Received response");
        if !status.is_success() {
            return Err(ProcessError::http_status(status.as_u16()));
        }

        response.bytes().await.map_err(ProcessError::from_reqwest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_invalid_user_agent_falls_back() {
        // Newlines are not valid header values
        let transport = HttpTransport::new("bad\nagent", DEFAULT_TIMEOUT);
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let transport = HttpTransport::new(DEFAULT_USER_AGENT, Duration::from_secs(2)).unwrap();
        // Port 1 on localhost is closed on any sane test machine
        let err = transport.get("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, ProcessError::Unreachable(_)));
    }
}
