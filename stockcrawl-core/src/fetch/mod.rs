//! Resilient fetch: one GET with bounded, fixed-delay retry.
//!
//! The upstream sites drop connections and rate-limit without warning, so every
//! page goes through [`Fetcher::fetch`]. A call either returns the payload or a
//! [`FetchError`] describing why it gave up; it never panics and never retries
//! beyond the policy. Callers decide what a missing page means.

pub mod browser;
pub mod retry;
pub mod transport;

pub use browser::{BrowserOptions, ScriptRenderer};
pub use retry::{FetchObserver, RetryPolicy, TracingObserver};
pub use transport::{HttpTransport, Transport, TransportError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// How a page has to be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Plain HTTP GET.
    Plain,
    /// Content is filled in by script after load; needs a browser.
    ScriptRendered,
}

/// A single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub mode: RenderMode,
}

impl FetchRequest {
    pub fn plain(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RenderMode::Plain,
        }
    }

    pub fn rendered(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RenderMode::ScriptRendered,
        }
    }
}

/// Why a fetch ended without a payload.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{transport}: gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        transport: String,
        url: String,
        attempts: u32,
        last: TransportError,
    },

    #[error("{transport}: request to {url} rejected: {reason}")]
    Rejected {
        transport: String,
        url: String,
        reason: TransportError,
    },

    #[error("no browser configured for script-rendered page {url}")]
    NoRenderer { url: String },
}

/// Outcome of one [`Fetcher::fetch`] call.
pub type FetchResult = Result<String, FetchError>;

/// Retrying fetcher over a plain transport and an optional browser transport.
///
/// Holds no per-call state: two calls with the same request behave the same.
pub struct Fetcher {
    plain: Box<dyn Transport>,
    rendered: Option<Box<dyn Transport>>,
    policy: RetryPolicy,
    observer: Box<dyn FetchObserver>,
}

impl Fetcher {
    pub fn new(plain: Box<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            plain,
            rendered: None,
            policy,
            observer: Box::new(TracingObserver),
        }
    }

    /// Use `renderer` for [`RenderMode::ScriptRendered`] requests.
    pub fn with_renderer(mut self, renderer: Box<dyn Transport>) -> Self {
        self.rendered = Some(renderer);
        self
    }

    /// Replace the default logging observer.
    pub fn with_observer(mut self, observer: Box<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch a page, retrying transient failures with a fixed delay.
    pub fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let transport: &dyn Transport = match request.mode {
            RenderMode::Plain => self.plain.as_ref(),
            RenderMode::ScriptRendered => match &self.rendered {
                Some(renderer) => renderer.as_ref(),
                None => {
                    return Err(FetchError::NoRenderer {
                        url: request.url.clone(),
                    })
                }
            },
        };
        self.fetch_with(transport, &request.url)
    }

    fn fetch_with(&self, transport: &dyn Transport, url: &str) -> FetchResult {
        let max = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(transport = transport.name(), url, attempt, "attempt");
            match transport.get(url) {
                Ok(body) => {
                    self.observer.on_success(url, attempt);
                    return Ok(body);
                }
                Err(e) if !e.is_transient() => {
                    self.observer.on_give_up(url, attempt, &e);
                    return Err(FetchError::Rejected {
                        transport: transport.name().to_string(),
                        url: url.to_string(),
                        reason: e,
                    });
                }
                Err(e) if attempt >= max => {
                    self.observer.on_give_up(url, attempt, &e);
                    return Err(FetchError::Exhausted {
                        transport: transport.name().to_string(),
                        url: url.to_string(),
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    self.observer.on_retry(url, attempt, &e);
                    std::thread::sleep(self.policy.delay);
                }
            }
        }
    }
}
