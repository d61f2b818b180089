//! stockcrawl core: market data retrieval from public web endpoints.
//!
//! Control flow for every source:
//! - [`catalog`] entry describes the URL, paging and layout
//! - [`walk`] fetches pages through the retrying [`fetch::Fetcher`]
//! - [`parse`] + [`normalize`] turn the pages into a canonical [`table::Table`]
//!
//! [`sources::Crawler`] bundles this into one call per data family.

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod params;
pub mod parse;
pub mod sources;
pub mod table;
pub mod walk;

pub use catalog::{Catalog, CatalogError, Field, SourceId, SourceSpec};
pub use config::{ConfigError, CrawlConfig};
pub use params::SourceParams;
pub use sources::{Crawler, Retrieval, Timeframe, WalkSummary};
pub use table::{Record, Table, TableError, Value};

use thiserror::Error;

/// Errors a retrieval call can return. All are caller or setup mistakes;
/// upstream failures only ever shorten the table.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Walk(#[from] walk::WalkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{source_id} needs a {param}")]
    MissingParam {
        source_id: SourceId,
        param: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}
