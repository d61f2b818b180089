//! Shared helpers: a scripted transport and fixture loading.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use stockcrawl_core::fetch::{Fetcher, RetryPolicy, Transport, TransportError};
use stockcrawl_core::{Catalog, Crawler};

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_dir().join(name))
        .unwrap_or_else(|e| panic!("missing fixture {name}: {e}"))
}

type Responder = Box<dyn Fn(&str) -> Result<String, TransportError>>;

struct Route {
    pattern: String,
    queued: VecDeque<Result<String, TransportError>>,
    responder: Option<Responder>,
}

/// In-memory transport answering by URL substring, first matching route wins.
///
/// A route serves its queued responses in order and then keeps repeating the
/// last one; a responder route computes the answer from the URL.
#[derive(Clone, Default)]
pub struct Scripted {
    routes: Rc<RefCell<Vec<Route>>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, responses: Vec<Result<String, TransportError>>) -> Self {
        self.routes.borrow_mut().push(Route {
            pattern: pattern.to_string(),
            queued: responses.into(),
            responder: None,
        });
        self
    }

    pub fn serve(self, pattern: &str, body: impl Into<String>) -> Self {
        self.on(pattern, vec![Ok(body.into())])
    }

    pub fn respond(
        self,
        pattern: &str,
        f: impl Fn(&str) -> Result<String, TransportError> + 'static,
    ) -> Self {
        self.routes.borrow_mut().push(Route {
            pattern: pattern.to_string(),
            queued: VecDeque::new(),
            responder: Some(Box::new(f)),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls.borrow().iter().filter(|u| u.contains(pattern)).count()
    }
}

impl Transport for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.calls.borrow_mut().push(url.to_string());
        let mut routes = self.routes.borrow_mut();
        let Some(route) = routes.iter_mut().find(|r| url.contains(&r.pattern)) else {
            return Err(TransportError::Status { status: 404 });
        };
        if let Some(f) = &route.responder {
            return f(url);
        }
        if route.queued.len() > 1 {
            route.queued.pop_front().unwrap_or(Err(TransportError::Status { status: 404 }))
        } else {
            route
                .queued
                .front()
                .cloned()
                .unwrap_or(Err(TransportError::Status { status: 404 }))
        }
    }
}

/// Page number from a `page=N` query parameter.
pub fn page_of(url: &str) -> u32 {
    url.split("page=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
}

pub fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

pub fn crawler(plain: &Scripted) -> Crawler {
    let fetcher = Fetcher::new(Box::new(plain.clone()), quick_policy());
    Crawler::new(fetcher, Catalog::builtin().unwrap())
}

pub fn crawler_with_renderer(plain: &Scripted, rendered: &Scripted) -> Crawler {
    let fetcher = Fetcher::new(Box::new(plain.clone()), quick_policy())
        .with_renderer(Box::new(rendered.clone()));
    Crawler::new(fetcher, Catalog::builtin().unwrap())
}

/// One page of the world index JSON feed with `n` rows.
pub fn world_page(symbol: &str, page: u32, n: usize) -> String {
    let rows: Vec<String> = (0..n)
        .map(|i| {
            let day = (page as usize - 1) * 10 + i;
            format!(
                r#"{{"symb":"{symbol}","xymd":"{}","open":{o},"high":{h},"low":{l},"clos":{c},"diff":1.0,"rate":0.1,"gvol":{v}}}"#,
                20200000 + 100 + day % 28 + 1 + (day / 28) * 100,
                o = 100.0 + i as f64,
                h = 101.0 + i as f64,
                l = 99.0 + i as f64,
                c = 100.5 + i as f64,
                v = 1000 + i,
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

/// One page of a fund's daily quote table.
pub fn fund_quote_page(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(date, price)| {
            format!(
                "<tr><td class=\"date\">{date}</td><td class=\"num\">{price}</td><td class=\"num\">+1.10</td><td class=\"num\">12,345</td><td class=\"num\">13,210</td></tr>\n<tr><td colspan=\"5\" class=\"blank\"></td></tr>\n"
            )
        })
        .collect();
    format!(
        r#"<html><body>
<table class="tbl_type1" summary="일자별 기준가">
<thead><tr><th>날짜</th><th>기준가</th><th>전일대비</th><th>설정원본</th><th>순자산총액</th></tr></thead>
<tbody>
{body}</tbody>
</table>
</body></html>"#
    )
}
