//! Page walker: fetch `page=1, 2, …` until the source's stop policy says done.
//!
//! Upstream listings carry no "has more" flag, so each source declares how
//! its last page is recognized. A fetch that gives up ends the walk and is
//! read as "no more data"; the walk itself is never retried.

use crate::catalog::{SourceId, SourceSpec};
use crate::fetch::{FetchRequest, Fetcher, RenderMode};
use crate::params::{SourceParams, TemplateError};
use crate::parse::ParseError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// How a paged source signals its last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop after a page with fewer records than the walker's threshold.
    ShortPage,
    /// Fetch pages `1..n_months*2 + 10` unconditionally.
    FixedCeiling,
    /// Stop at the first page missing the expected structure.
    ContentAbsence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// One request, no `{page}`.
    Single,
    Paged(StopPolicy),
}

/// Pages requested by [`StopPolicy::FixedCeiling`] for `n_months`.
pub fn fixed_ceiling_pages(n_months: u32) -> u32 {
    // Upstream range is 1..n_months*2+10, exclusive.
    n_months.saturating_mul(2).saturating_add(10) - 1
}

/// Default [`StopPolicy::ShortPage`] threshold.
pub const SHORT_PAGE_THRESHOLD: usize = 10;

/// One fetched page, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 1-based page number (1 for single-page sources).
    pub index: u32,
    pub payload: String,
}

/// Per-walk state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    records: usize,
    done: bool,
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 1,
            records: 0,
            done: false,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Count a successful page and move to the next one.
    pub fn advance(&mut self, records: usize) {
        self.records += records;
        self.page += 1;
    }

    pub fn finish(&mut self) {
        self.done = true;
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    SinglePage,
    ShortPage,
    CeilingReached,
    ContentAbsent,
    HeaderMismatch,
    FetchFailed,
    HardCeiling,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::SinglePage => "single page",
            StopReason::ShortPage => "short page",
            StopReason::CeilingReached => "page ceiling reached",
            StopReason::ContentAbsent => "content absent",
            StopReason::HeaderMismatch => "header mismatch",
            StopReason::FetchFailed => "fetch failed",
            StopReason::HardCeiling => "hard page ceiling",
        };
        f.write_str(s)
    }
}

/// What one walk produced.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub source: SourceId,
    pub pages: Vec<RawPage>,
    /// Fetch calls made, successful or not.
    pub fetched: u32,
    /// Records counted while deciding when to stop (0 for single pages).
    pub records: usize,
    pub stop: StopReason,
}

/// Caller mistakes caught before any request goes out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    #[error("{source_id}: {error}")]
    Template {
        source_id: SourceId,
        error: TemplateError,
    },

    #[error("{0}: fixed page ceiling needs n_months")]
    MissingMonths(SourceId),
}

pub struct PageWalker<'a> {
    fetcher: &'a Fetcher,
    short_page_threshold: usize,
}

impl<'a> PageWalker<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self {
            fetcher,
            short_page_threshold: SHORT_PAGE_THRESHOLD,
        }
    }

    pub fn with_short_page_threshold(mut self, threshold: usize) -> Self {
        self.short_page_threshold = threshold;
        self
    }

    fn request(spec: &SourceSpec, url: String) -> FetchRequest {
        match spec.render {
            RenderMode::Plain => FetchRequest::plain(url),
            RenderMode::ScriptRendered => FetchRequest::rendered(url),
        }
    }

    fn url(spec: &SourceSpec, params: &SourceParams, page: Option<u32>) -> Result<String, WalkError> {
        params
            .render(spec.url_template, page)
            .map_err(|error| WalkError::Template {
                source_id: spec.id,
                error,
            })
    }

    /// Walk one source for one parameter set.
    pub fn walk(&self, spec: &SourceSpec, params: &SourceParams) -> Result<WalkOutcome, WalkError> {
        match spec.pagination {
            Pagination::Single => self.single(spec, params),
            Pagination::Paged(policy) => self.paged(spec, params, policy),
        }
    }

    fn single(&self, spec: &SourceSpec, params: &SourceParams) -> Result<WalkOutcome, WalkError> {
        let url = Self::url(spec, params, None)?;
        let mut outcome = WalkOutcome {
            source: spec.id,
            pages: Vec::new(),
            fetched: 1,
            records: 0,
            stop: StopReason::SinglePage,
        };
        match self.fetcher.fetch(&Self::request(spec, url)) {
            Ok(payload) => outcome.pages.push(RawPage { index: 1, payload }),
            Err(e) => {
                warn!(source = %spec.id, error = %e, "fetch failed, no data");
                outcome.stop = StopReason::FetchFailed;
            }
        }
        Ok(outcome)
    }

    fn paged(
        &self,
        spec: &SourceSpec,
        params: &SourceParams,
        policy: StopPolicy,
    ) -> Result<WalkOutcome, WalkError> {
        let ceiling = match policy {
            StopPolicy::FixedCeiling => {
                let n_months = params.n_months.ok_or(WalkError::MissingMonths(spec.id))?;
                Some(fixed_ceiling_pages(n_months))
            }
            StopPolicy::ShortPage | StopPolicy::ContentAbsence => None,
        };
        let hard = spec.max_pages.unwrap_or(u32::MAX);
        // Check the template before the first request.
        Self::url(spec, params, Some(1))?;

        let mut cursor = PageCursor::new();
        let mut pages = Vec::new();
        let mut fetched = 0;
        let mut stop = StopReason::CeilingReached;

        while !cursor.is_done() {
            let page = cursor.page();
            if ceiling.is_some_and(|c| page > c) {
                stop = StopReason::CeilingReached;
                break;
            }
            if page > hard {
                warn!(source = %spec.id, hard, "hard page ceiling reached");
                stop = StopReason::HardCeiling;
                break;
            }

            let url = Self::url(spec, params, Some(page))?;
            fetched += 1;
            let payload = match self.fetcher.fetch(&Self::request(spec, url)) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(source = %spec.id, page, error = %e, "walk ended by fetch failure");
                    stop = StopReason::FetchFailed;
                    break;
                }
            };

            let parsed = spec.format.parse(&payload, params);
            pages.push(RawPage {
                index: page,
                payload,
            });

            match (policy, parsed) {
                (StopPolicy::FixedCeiling, Ok(raw)) => cursor.advance(raw.len()),
                (StopPolicy::FixedCeiling, Err(e)) => {
                    warn!(source = %spec.id, page, error = %e, "page did not parse, continuing");
                    cursor.advance(0);
                }
                (StopPolicy::ShortPage, Ok(raw)) => {
                    cursor.advance(raw.len());
                    if raw.len() < self.short_page_threshold {
                        stop = StopReason::ShortPage;
                        cursor.finish();
                    }
                }
                (StopPolicy::ContentAbsence, Ok(raw)) => cursor.advance(raw.len()),
                (_, Err(e)) => {
                    stop = self.parse_stop(spec, page, &e);
                    cursor.finish();
                }
            }
            debug!(source = %spec.id, page, records = cursor.records(), "page fetched");
        }

        debug!(source = %spec.id, fetched, records = cursor.records(), %stop, "walk finished");
        Ok(WalkOutcome {
            source: spec.id,
            pages,
            fetched,
            records: cursor.records(),
            stop,
        })
    }

    fn parse_stop(&self, spec: &SourceSpec, page: u32, e: &ParseError) -> StopReason {
        match e {
            ParseError::HeaderMismatch { .. } => {
                error!(source = %spec.id, page, error = %e, "page layout changed");
                StopReason::HeaderMismatch
            }
            e if e.is_absence() => {
                debug!(source = %spec.id, page, "expected content absent, listing ends");
                StopReason::ContentAbsent
            }
            e => {
                warn!(source = %spec.id, page, error = %e, "unreadable page ends the walk");
                StopReason::ContentAbsent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, SourceId};
    use crate::fetch::{RetryPolicy, Transport, TransportError};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Serves page N from `pages[N-1]`; anything past the end fails.
    struct Pages {
        pages: Vec<String>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl Transport for Pages {
        fn name(&self) -> &str {
            "pages"
        }

        fn get(&self, url: &str) -> Result<String, TransportError> {
            self.calls.borrow_mut().push(url.to_string());
            let page: usize = url
                .rsplit("page=")
                .next()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            self.pages
                .get(page - 1)
                .cloned()
                .ok_or(TransportError::Status { status: 503 })
        }
    }

    fn fetcher(pages: Vec<String>) -> (Fetcher, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let transport = Pages {
            pages,
            calls: calls.clone(),
        };
        let fetcher = Fetcher::new(Box::new(transport), RetryPolicy::new(1, Duration::ZERO));
        (fetcher, calls)
    }

    fn world_page(n: usize) -> String {
        let rows: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"symb":"SPI@SPX","xymd":"2020{:04}","clos":{i}.5}}"#, i + 101))
            .collect();
        format!("[{}]", rows.join(","))
    }

    fn spec(id: SourceId) -> SourceSpec {
        *Catalog::builtin().unwrap().get(id).unwrap()
    }

    #[test]
    fn short_page_stops_and_is_kept() {
        let (fetcher, calls) = fetcher([10, 10, 10, 7, 10].map(world_page).to_vec());
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::GlobalIndex), &SourceParams::for_ticker("SPI@SPX"))
            .unwrap();
        assert_eq!(calls.borrow().len(), 4);
        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.records, 37);
        assert_eq!(outcome.pages.len(), 4);
        assert_eq!(outcome.pages[3].index, 4);
        assert_eq!(outcome.stop, StopReason::ShortPage);
    }

    #[test]
    fn fixed_ceiling_fetches_every_page() {
        let (fetcher, calls) = fetcher(vec!["<html></html>".to_string(); 30]);
        let params = SourceParams::for_ticker("K55105BU1234").with_months(5);
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::FundPrice), &params)
            .unwrap();
        assert_eq!(calls.borrow().len(), 19);
        assert_eq!(outcome.pages.len(), 19);
        assert_eq!(outcome.stop, StopReason::CeilingReached);
        assert!(calls.borrow()[18].ends_with("page=19"));
    }

    #[test]
    fn fixed_ceiling_needs_months() {
        let (fetcher, calls) = fetcher(vec![]);
        let err = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::FundPrice), &SourceParams::for_ticker("X"))
            .unwrap_err();
        assert_eq!(err, WalkError::MissingMonths(SourceId::FundPrice));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn missing_ticker_fails_before_any_request() {
        let (fetcher, calls) = fetcher(vec![world_page(3)]);
        let err = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::GlobalIndex), &SourceParams::default())
            .unwrap_err();
        assert!(matches!(err, WalkError::Template { .. }));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn fetch_failure_ends_walk_keeping_earlier_pages() {
        let (fetcher, _) = fetcher([10, 10].map(world_page).to_vec());
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::GlobalIndex), &SourceParams::for_ticker("SPI@SPX"))
            .unwrap();
        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.stop, StopReason::FetchFailed);
    }

    #[test]
    fn content_absence_stops_at_missing_table() {
        let listing = r#"<table class="tbl_fund"><tr><th>펀드명</th><th>설정일</th></tr>
<tr><td><a href="?fundCd=A1">A</a></td><td>2019.01.02</td></tr></table>"#;
        let (fetcher, calls) = fetcher(vec![
            listing.to_string(),
            listing.to_string(),
            "<p>없음</p>".to_string(),
            listing.to_string(),
        ]);
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::FundDiscovery), &SourceParams::default())
            .unwrap();
        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.stop, StopReason::ContentAbsent);
    }

    #[test]
    fn header_mismatch_stops_walk() {
        let changed = r#"<table class="tbl_fund"><tr><th>이름</th></tr></table>"#;
        let (fetcher, _) = fetcher(vec![changed.to_string(); 3]);
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::FundDiscovery), &SourceParams::default())
            .unwrap();
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.stop, StopReason::HeaderMismatch);
    }

    #[test]
    fn hard_ceiling_bounds_paged_walks() {
        let mut s = spec(SourceId::GlobalIndex);
        s.max_pages = Some(3);
        let (fetcher, _) = fetcher(vec![world_page(10); 10]);
        let outcome = PageWalker::new(&fetcher)
            .walk(&s, &SourceParams::for_ticker("SPI@SPX"))
            .unwrap();
        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.stop, StopReason::HardCeiling);
    }

    #[test]
    fn single_page_source() {
        let chart = r#"<chartdata><item data="20200102|1|2|0.5|1.5|100" /></chartdata>"#;
        let (fetcher, calls) = fetcher(vec![chart.to_string()]);
        let params = SourceParams::for_ticker("KOSPI")
            .with_timeframe("day")
            .with_count(10_000);
        let outcome = PageWalker::new(&fetcher)
            .walk(&spec(SourceId::DomesticIndex), &params)
            .unwrap();
        assert_eq!(outcome.stop, StopReason::SinglePage);
        assert_eq!(outcome.pages.len(), 1);
        assert!(calls.borrow()[0].contains("symbol=KOSPI&timeframe=day&count=10000"));
    }

    #[test]
    fn ceiling_arithmetic() {
        assert_eq!(fixed_ceiling_pages(5), 19);
        assert_eq!(fixed_ceiling_pages(0), 9);
    }

    #[test]
    fn ceiling_saturates_for_huge_month_counts() {
        assert_eq!(fixed_ceiling_pages(1 << 31), u32::MAX - 1);
        assert_eq!(fixed_ceiling_pages(u32::MAX), u32::MAX - 1);
        assert_eq!(fixed_ceiling_pages(u32::MAX / 2 - 4), u32::MAX - 1);
    }

    proptest! {
        #[test]
        fn short_page_fetch_count(full in 0usize..8, last in 0usize..10) {
            let mut sizes = vec![10; full];
            sizes.push(last);
            sizes.push(10);
            let (fetcher, calls) = fetcher(sizes.iter().map(|n| world_page(*n)).collect());
            let outcome = PageWalker::new(&fetcher)
                .walk(&spec(SourceId::GlobalIndex), &SourceParams::for_ticker("SPI@SPX"))
                .unwrap();
            prop_assert_eq!(calls.borrow().len(), full + 1);
            prop_assert_eq!(outcome.records, full * 10 + last);
            prop_assert_eq!(outcome.stop, StopReason::ShortPage);
        }

        #[test]
        fn fixed_ceiling_fetch_count(n_months in 0u32..12) {
            let (fetcher, calls) = fetcher(vec![String::from("<html></html>"); 40]);
            let params = SourceParams::for_ticker("F").with_months(n_months);
            PageWalker::new(&fetcher).walk(&spec(SourceId::FundPrice), &params).unwrap();
            prop_assert_eq!(calls.borrow().len() as u32, n_months * 2 + 9);
        }
    }
}
