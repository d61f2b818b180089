//! Crawl configuration, loadable from TOML.
//!
//! Every field has a default, so an empty document reproduces the stock
//! behavior: ten attempts five seconds apart, headless browser, short pages
//! below ten records.

use crate::catalog::{Catalog, CatalogError};
use crate::fetch::{BrowserOptions, Fetcher, HttpTransport, RetryPolicy, ScriptRenderer, TransportError};
use crate::sources::Crawler;
use crate::walk::SHORT_PAGE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to set up transport: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid source catalog: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            delay_secs: RetryPolicy::DEFAULT_DELAY.as_secs_f64(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::try_from_secs_f64(self.delay_secs).unwrap_or(RetryPolicy::DEFAULT_DELAY),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Per-request timeout; unset keeps the client default.
    pub timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("stockcrawl/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub short_page_threshold: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            short_page_threshold: SHORT_PAGE_THRESHOLD,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub retry: RetryConfig,
    pub http: HttpConfig,
    pub browser: BrowserOptions,
    pub paging: PagingConfig,
}

impl CrawlConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fetcher with the HTTP transport and the browser renderer.
    pub fn fetcher(&self) -> Result<Fetcher, ConfigError> {
        let http = HttpTransport::new(
            &self.http.user_agent,
            self.http.timeout_secs.map(Duration::from_secs),
        )?;
        let renderer = ScriptRenderer::new(self.browser.clone())?;
        Ok(Fetcher::new(Box::new(http), self.retry.policy()).with_renderer(Box::new(renderer)))
    }

    /// Crawler over the built-in catalog.
    pub fn crawler(&self) -> Result<Crawler, ConfigError> {
        Ok(Crawler::new(self.fetcher()?, Catalog::builtin()?)
            .with_short_page_threshold(self.paging.short_page_threshold))
    }
}
