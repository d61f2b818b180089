//! Retrieval operations: one call per data family, each returning a full table.
//!
//! Every call walks one or more parameter sets through the catalog entry,
//! normalizes the pages and concatenates the results. Upstream trouble never
//! surfaces as `Err`; it shows up as fewer rows and in the per-walk summary.
//! `Err` is reserved for mistakes by the caller.

use crate::catalog::{
    Catalog, SourceId, DOMESTIC_INDEXES, EXCHANGE_TRADED_KINDS, GLOBAL_INDEXES, INDEX_BAR_COUNT,
};
use crate::fetch::Fetcher;
use crate::normalize::{NormalizeContext, Normalizer};
use crate::params::{placeholders, SourceParams};
use crate::table::Table;
use crate::walk::{PageWalker, StopReason, WalkOutcome, SHORT_PAGE_THRESHOLD};
use crate::CrawlError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::info;

/// Bar width for chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Day,
    Week,
    Month,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            other => Err(CrawlError::InvalidParam(format!("unknown timeframe {other:?}"))),
        }
    }
}

/// How one walk went, without its payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub source: SourceId,
    pub ticker: Option<String>,
    pub kind: Option<String>,
    pub pages: usize,
    pub fetched: u32,
    pub stop: StopReason,
}

impl WalkSummary {
    fn new(params: &SourceParams, outcome: &WalkOutcome) -> Self {
        Self {
            source: outcome.source,
            ticker: params.ticker.clone(),
            kind: params.kind.clone(),
            pages: outcome.pages.len(),
            fetched: outcome.fetched,
            stop: outcome.stop,
        }
    }

    /// The walk ended on its own terms rather than on an upstream failure.
    pub fn is_complete(&self) -> bool {
        !matches!(self.stop, StopReason::FetchFailed | StopReason::HeaderMismatch)
    }
}

/// Result of a retrieval call.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub source: SourceId,
    pub table: Table,
    pub walks: Vec<WalkSummary>,
}

impl Retrieval {
    pub fn is_complete(&self) -> bool {
        self.walks.iter().all(WalkSummary::is_complete)
    }

    pub fn pages_fetched(&self) -> u32 {
        self.walks.iter().map(|w| w.fetched).sum()
    }
}

/// Runs catalog sources through the walker and normalizer.
pub struct Crawler {
    fetcher: Fetcher,
    catalog: Catalog,
    short_page_threshold: usize,
    as_of: Option<NaiveDate>,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, catalog: Catalog) -> Self {
        Self {
            fetcher,
            catalog,
            short_page_threshold: SHORT_PAGE_THRESHOLD,
            as_of: None,
        }
    }

    pub fn with_short_page_threshold(mut self, threshold: usize) -> Self {
        self.short_page_threshold = threshold;
        self
    }

    /// Pin the reference date for month counts (defaults to today).
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Retrieve one source for one parameter set.
    pub fn retrieve(&self, id: SourceId, params: &SourceParams) -> Result<Retrieval, CrawlError> {
        let spec = self.catalog.get(id)?;
        let needs_ticker = placeholders(spec.url_template)
            .map(|names| names.contains(&"ticker"))
            .unwrap_or(false);
        if needs_ticker && params.ticker.as_deref().map_or(true, str::is_empty) {
            return Err(CrawlError::MissingParam {
                source_id: id,
                param: "ticker",
            });
        }

        let outcome = PageWalker::new(&self.fetcher)
            .with_short_page_threshold(self.short_page_threshold)
            .walk(spec, params)?;

        let ctx = match self.as_of {
            Some(date) => NormalizeContext::new(params.ticker.clone(), date),
            None => NormalizeContext::today(params.ticker.clone()),
        };
        let table = Normalizer::new(spec, ctx).normalize(&outcome.pages, params);

        info!(
            source = %id,
            ticker = params.ticker.as_deref().unwrap_or("-"),
            pages = outcome.pages.len(),
            records = table.len(),
            stop = %outcome.stop,
            "crawl completed"
        );
        Ok(Retrieval {
            source: id,
            table,
            walks: vec![WalkSummary::new(params, &outcome)],
        })
    }

    /// Retrieve one source for several parameter sets and concatenate.
    pub fn retrieve_many(
        &self,
        id: SourceId,
        params: &[SourceParams],
    ) -> Result<Retrieval, CrawlError> {
        let spec = self.catalog.get(id)?;
        let started = Instant::now();
        let mut combined = Retrieval {
            source: id,
            table: Table::new(spec.column_names()),
            walks: Vec::with_capacity(params.len()),
        };

        for p in params {
            let part = self.retrieve(id, p)?;
            combined.table.append(part.table)?;
            combined.walks.extend(part.walks);
        }

        let elapsed = started.elapsed().as_secs_f64();
        let minutes = (elapsed / 60.0).floor();
        let seconds = (elapsed % 60.0).round();
        info!(
            source = %id,
            tickers = params.len(),
            records = combined.table.len(),
            "crawl cost: {minutes} min {seconds} sec"
        );
        Ok(combined)
    }

    /// KOSPI and KOSDAQ daily bars.
    pub fn indexes(&self) -> Result<Retrieval, CrawlError> {
        let params: Vec<SourceParams> = DOMESTIC_INDEXES
            .iter()
            .map(|t| {
                SourceParams::for_ticker(*t)
                    .with_timeframe(Timeframe::Day.as_str())
                    .with_count(INDEX_BAR_COUNT)
            })
            .collect();
        self.retrieve_many(SourceId::DomesticIndex, &params)
    }

    /// Bars for one listed stock.
    pub fn stock_price(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        count: u32,
    ) -> Result<Retrieval, CrawlError> {
        let params = SourceParams::for_ticker(ticker)
            .with_timeframe(timeframe.as_str())
            .with_count(count);
        self.retrieve(SourceId::StockPrice, &params)
    }

    /// S&P500, Nikkei, Eurostoxx and Shanghai daily closes.
    pub fn global_indexes(&self) -> Result<Retrieval, CrawlError> {
        let params: Vec<SourceParams> = GLOBAL_INDEXES
            .iter()
            .map(|(symbol, _)| SourceParams::for_ticker(*symbol))
            .collect();
        self.retrieve_many(SourceId::GlobalIndex, &params)
    }

    /// ETF and ETN listings, concatenated.
    pub fn etf_tickers(&self) -> Result<Retrieval, CrawlError> {
        let params: Vec<SourceParams> = EXCHANGE_TRADED_KINDS
            .iter()
            .map(|kind| SourceParams::default().with_kind(*kind))
            .collect();
        self.retrieve_many(SourceId::EtfList, &params)
    }

    /// All exchange-listed companies.
    pub fn exchange_tickers(&self) -> Result<Retrieval, CrawlError> {
        self.retrieve(SourceId::ExchangeList, &SourceParams::default())
    }

    /// Daily prices of one fund over roughly its last `n_months`.
    pub fn fund_price(&self, ticker: &str, n_months: u32) -> Result<Retrieval, CrawlError> {
        self.retrieve(
            SourceId::FundPrice,
            &SourceParams::for_ticker(ticker).with_months(n_months),
        )
    }

    /// Fund directory with setup dates and months since setup.
    pub fn fund_tickers(&self) -> Result<Retrieval, CrawlError> {
        self.retrieve(SourceId::FundDiscovery, &SourceParams::default())
    }

    pub fn fundamental_snapshot(&self, ticker: &str) -> Result<Retrieval, CrawlError> {
        self.retrieve(SourceId::FundamentalSnapshot, &SourceParams::for_ticker(ticker))
    }

    pub fn fundamental_statement(&self, ticker: &str) -> Result<Retrieval, CrawlError> {
        self.retrieve(SourceId::FundamentalStatement, &SourceParams::for_ticker(ticker))
    }

    /// Broker estimates; needs the browser renderer.
    pub fn consensus(&self, ticker: &str) -> Result<Retrieval, CrawlError> {
        self.retrieve(SourceId::Consensus, &SourceParams::for_ticker(ticker))
    }
}
