//! Transport trait and the plain HTTP implementation.
//!
//! The Transport trait abstracts over how a single GET is carried out (plain
//! HTTP, headless browser) so the retry loop can be shared and mocked in tests.
//! A transport performs exactly one attempt; retrying is the Fetcher's job.

use std::time::Duration;
use thiserror::Error;

/// Structured failure of a single transport attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Only a request that could not be built at all is final. Any HTTP status
    /// is retried: the upstream answers throttling with 403 as often as 429.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

/// One GET attempt against an upstream endpoint.
pub trait Transport {
    /// Short name, reported in log lines and fetch errors.
    fn name(&self) -> &str;

    /// Fetch `url` once and return the decoded body.
    fn get(&self, url: &str) -> Result<String, TransportError>;
}

/// Plain blocking HTTP GET.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client with the given user agent and optional request timeout.
    ///
    /// Without a timeout the client keeps reqwest's default.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        let resp = self.client.get(url).send().map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        // text() honours the charset in Content-Type; several upstreams serve EUC-KR.
        resp.text().map_err(|e| TransportError::Body(e.to_string()))
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}
