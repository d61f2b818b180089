//! Retry behavior as seen from a retrieval call.

mod common;

use common::{fixture, Scripted};
use std::time::{Duration, Instant};
use stockcrawl_core::fetch::{Fetcher, RetryPolicy, TransportError};
use stockcrawl_core::walk::StopReason;
use stockcrawl_core::{Catalog, Crawler};

fn crawler_with(upstream: &Scripted, policy: RetryPolicy) -> Crawler {
    let fetcher = Fetcher::new(Box::new(upstream.clone()), policy);
    Crawler::new(fetcher, Catalog::builtin().unwrap())
}

fn unavailable() -> Result<String, TransportError> {
    Err(TransportError::Status { status: 503 })
}

#[test]
fn transient_failures_are_retried_with_delay() {
    let upstream = Scripted::new().on(
        "corpList.do",
        vec![unavailable(), unavailable(), Ok(fixture("krx_corp_list.html"))],
    );
    let started = Instant::now();
    let result = crawler_with(&upstream, RetryPolicy::new(10, Duration::from_millis(20)))
        .exchange_tickers()
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(upstream.calls().len(), 3);
    assert_eq!(result.table.len(), 3);
    assert!(result.is_complete());
}

#[test]
fn exhausted_retries_give_an_empty_table() {
    let upstream = Scripted::new().on("corpList.do", vec![unavailable()]);
    let result = crawler_with(&upstream, RetryPolicy::new(10, Duration::ZERO))
        .exchange_tickers()
        .unwrap();

    assert_eq!(upstream.calls().len(), 10);
    assert!(result.table.is_empty());
    assert_eq!(result.walks[0].stop, StopReason::FetchFailed);
    assert_eq!(result.pages_fetched(), 1);
}

#[test]
fn throttling_forbidden_is_retried_to_the_limit() {
    let upstream = Scripted::new().on("corpList.do", vec![Err(TransportError::Status { status: 403 })]);
    let result = crawler_with(&upstream, RetryPolicy::new(10, Duration::ZERO))
        .exchange_tickers()
        .unwrap();

    assert_eq!(upstream.calls().len(), 10);
    assert!(result.table.is_empty());
    assert!(!result.is_complete());
}

#[test]
fn forbidden_then_served_recovers() {
    let upstream = Scripted::new().on(
        "corpList.do",
        vec![
            Err(TransportError::Status { status: 403 }),
            Err(TransportError::Status { status: 404 }),
            Ok(fixture("krx_corp_list.html")),
        ],
    );
    let result = crawler_with(&upstream, RetryPolicy::new(10, Duration::ZERO))
        .exchange_tickers()
        .unwrap();
    assert_eq!(upstream.calls().len(), 3);
    assert_eq!(result.table.len(), 3);
}

#[test]
fn rate_limiting_is_retried() {
    let upstream = Scripted::new().on(
        "corpList.do",
        vec![
            Err(TransportError::Status { status: 429 }),
            Ok(fixture("krx_corp_list.html")),
        ],
    );
    let result = crawler_with(&upstream, RetryPolicy::new(3, Duration::ZERO))
        .exchange_tickers()
        .unwrap();
    assert_eq!(upstream.calls().len(), 2);
    assert_eq!(result.table.len(), 3);
}

#[test]
fn repeated_calls_are_independent() {
    let upstream = Scripted::new().serve("SVD_Main.asp", fixture("fnguide_snapshot.html"));
    let crawler = crawler_with(&upstream, RetryPolicy::new(3, Duration::ZERO));
    let first = crawler.fundamental_snapshot("005930").unwrap();
    let second = crawler.fundamental_snapshot("005930").unwrap();
    assert_eq!(first.table, second.table);
    assert_eq!(upstream.calls().len(), 2);
}
