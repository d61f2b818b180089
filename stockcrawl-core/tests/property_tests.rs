//! Property tests over whole retrievals.

mod common;

use chrono::NaiveDate;
use common::{crawler, fund_quote_page, page_of, world_page, Scripted};
use proptest::prelude::*;
use std::collections::BTreeSet;
use stockcrawl_core::Value;

fn quote_rows(days: &[u32]) -> String {
    let rows: Vec<(String, String)> = days
        .iter()
        .map(|d| (format!("2020.03.{d:02}"), format!("{}.5", 1000 + d)))
        .collect();
    let borrowed: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    fund_quote_page(&borrowed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Overlapping fund pages collapse to one row per distinct quote.
    #[test]
    fn fund_pages_dedup_to_distinct_quotes(
        pages in prop::collection::vec(prop::collection::vec(1u32..=28, 0..6), 9)
    ) {
        let served = pages.clone();
        let upstream = Scripted::new().respond("fundDailyQuoteList", move |url| {
            Ok(quote_rows(&served[page_of(url) as usize - 1]))
        });
        let result = crawler(&upstream).fund_price("F1", 0).unwrap();

        let distinct: BTreeSet<u32> = pages.iter().flatten().copied().collect();
        prop_assert_eq!(upstream.calls().len(), 9);
        prop_assert_eq!(result.table.len(), distinct.len());

        let dates: BTreeSet<NaiveDate> = result
            .table
            .column("tdate")
            .unwrap()
            .into_iter()
            .filter_map(Value::as_date)
            .collect();
        prop_assert_eq!(dates.len(), distinct.len());
    }

    /// Short-page walks keep every row of every page they fetched.
    #[test]
    fn short_page_walks_keep_all_rows(full in 0u32..6, last in 0usize..10) {
        let upstream = Scripted::new().respond("worldDayListJson", move |url| {
            let page = page_of(url);
            let n = if page <= full { 10 } else { last };
            Ok(world_page("SPI@SPX", page, n))
        });
        let result = crawler(&upstream).global_indexes().unwrap();
        let per_symbol = full as usize * 10 + last;

        prop_assert_eq!(result.table.len(), per_symbol * 4);
        prop_assert_eq!(upstream.calls().len(), (full as usize + 1) * 4);
    }
}
