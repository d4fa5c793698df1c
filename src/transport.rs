//! HTTP transport used by the poll driver.
//!
//! The driver talks to the service through [`AnalysisTransport`] so the
//! polling state machine can be exercised without a network. The production
//! implementation is [`HttpTransport`], a thin wrapper around one pooled
//! `reqwest::Client` reused for every attempt.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::errors::{Result, TlsGradeError};

/// Status line and body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Full body for `200 OK`; left empty for other statuses.
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// The request could not be completed (connect, TLS, timeout, body read).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::timeout(e.to_string())
        } else {
            TransportError::new(e.to_string())
        }
    }
}

/// Issues a single GET against the analysis endpoint.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn get(&self, url: &Url) -> std::result::Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|source| TlsGradeError::HttpClient { source })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn get(&self, url: &Url) -> std::result::Result<TransportResponse, TransportError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();

        if status != 200 {
            return Ok(TransportResponse::with_status(status));
        }

        let body = response.bytes().await?;
        Ok(TransportResponse::ok(body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_helpers() {
        assert!(TransportResponse::ok("{}").is_ok());
        let unavailable = TransportResponse::with_status(503);
        assert!(!unavailable.is_ok());
        assert!(unavailable.body.is_empty());
    }

    #[test]
    fn error_flags() {
        assert!(TransportError::timeout("operation timed out").is_timeout());
        let refused = TransportError::new("connection refused");
        assert!(!refused.is_timeout());
        assert_eq!(refused.to_string(), "connection refused");
    }

    #[test]
    fn builds_client_from_default_config() {
        assert!(HttpTransport::new(&ApiConfig::default()).is_ok());
    }
}
