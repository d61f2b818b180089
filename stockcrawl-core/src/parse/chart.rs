//! Chart feed: `<item data="20200102|2201.21|2202.32|2171.84|2175.17|494"/>`.

use super::{cell, RawTable};
use crate::table::Value;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("item").expect("static selector"));

/// Split every item's `data` attribute on `|` and name the fields by position.
///
/// Items with the wrong field count are skipped. `null` fields are nulls.
pub fn parse_items(payload: &str, columns: &[&str]) -> RawTable {
    let doc = Html::parse_document(payload);
    let mut raw = RawTable::new(columns.iter().map(|c| c.to_string()).collect());

    for item in doc.select(&ITEM) {
        let Some(data) = item.value().attr("data") else {
            continue;
        };
        let fields: Vec<&str> = data.split('|').collect();
        if fields.len() != columns.len() {
            continue;
        }
        raw.rows.push(
            fields
                .into_iter()
                .map(|f| match f.trim() {
                    "null" => Value::Null,
                    other => cell(other.to_string()),
                })
                .collect(),
        );
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["tdate", "open", "high", "low", "close", "volume"];

    #[test]
    fn parses_items_in_order() {
        let payload = r#"<?xml version="1.0" encoding="EUC-KR" ?>
<protocol>
  <chartdata symbol="KOSPI" name="KOSPI" count="2" timeframe="day" precision="2" origintime="19900103">
    <item data="20200102|2201.21|2202.32|2171.84|2175.17|494" />
    <item data="20200103|2192.58|2203.38|2165.39|2176.46|631" />
  </chartdata>
</protocol>"#;
        let raw = parse_items(payload, COLUMNS);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.rows[0][0], Value::text("20200102"));
        assert_eq!(raw.rows[1][4], Value::text("2176.46"));
    }

    #[test]
    fn skips_malformed_items() {
        let payload = r#"<chartdata><item data="20200102|1|2" /><item /><item data="20200103|1|2|3|4|null" /></chartdata>"#;
        let raw = parse_items(payload, COLUMNS);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.rows[0][5], Value::Null);
    }
}
