//! Fund finder listing: one row per fund, the fund code lives in the link.

use super::html::text_of;
use super::{cell, ParseError, RawTable};
use scraper::{Html, Selector};
use std::sync::LazyLock;

const MARKER: &str = "table.tbl_fund";
const NAME_HEADER: &str = "펀드명";
const SETUP_HEADER: &str = "설정일";

static FUND_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(MARKER).expect("static selector"));
static HEADER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("static selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("static selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='fundCd=']").expect("static selector"));

fn fund_code(href: &str) -> Option<&str> {
    let start = href.find("fundCd=")? + "fundCd=".len();
    let code = href[start..].split(['&', '#']).next()?;
    (!code.is_empty()).then_some(code)
}

/// Parse one page of the fund finder into `sdate, ticker, name`.
///
/// A page without the fund table means the listing is exhausted.
pub fn parse_fund_list(payload: &str) -> Result<RawTable, ParseError> {
    let doc = Html::parse_document(payload);
    let table = doc
        .select(&FUND_TABLE)
        .next()
        .ok_or_else(|| ParseError::MarkerMissing(MARKER.to_string()))?;

    let headers: Vec<String> = table.select(&HEADER).map(text_of).collect();
    let name_col = headers.iter().position(|h| h == NAME_HEADER);
    let setup_col = headers.iter().position(|h| h == SETUP_HEADER);
    let (Some(name_col), Some(setup_col)) = (name_col, setup_col) else {
        return Err(ParseError::HeaderMismatch {
            expected: vec![NAME_HEADER.to_string(), SETUP_HEADER.to_string()],
            found: headers,
        });
    };

    let mut raw = RawTable::new(vec!["sdate".into(), "ticker".into(), "name".into()]);
    for tr in table.select(&ROW) {
        let cells: Vec<_> = tr.select(&TD).collect();
        let (Some(name_cell), Some(setup_cell)) = (cells.get(name_col), cells.get(setup_col)) else {
            continue;
        };
        let Some(code) = name_cell
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(fund_code)
        else {
            continue;
        };
        raw.rows.push(vec![
            cell(text_of(*setup_cell)),
            cell(code.to_string()),
            cell(text_of(*name_cell)),
        ]);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    const PAGE: &str = r#"<html><body>
<table class="tbl_fund">
<thead><tr><th>펀드명</th><th>유형</th><th>설정일</th></tr></thead>
<tbody>
<tr><td><a href="/fund/fundDetail.nhn?fundCd=K55105BU1234&amp;tab=1">미래에셋 인덱스 펀드</a></td><td>주식형</td><td>2019.07.01</td></tr>
<tr><td class="blank" colspan="3"></td></tr>
<tr><td>링크 없음</td><td>채권형</td><td>2018.01.02</td></tr>
<tr><td><a href="/fund/fundDetail.nhn?fundCd=KR5101888398">삼성 코리아 펀드</a></td><td>혼합형</td><td>2020.03.16</td></tr>
</tbody>
</table>
</body></html>"#;

    #[test]
    fn extracts_code_from_link() {
        let raw = parse_fund_list(PAGE).unwrap();
        assert_eq!(raw.columns, vec!["sdate", "ticker", "name"]);
        assert_eq!(raw.len(), 2);
        assert_eq!(
            raw.rows[0],
            vec![
                Value::text("2019.07.01"),
                Value::text("K55105BU1234"),
                Value::text("미래에셋 인덱스 펀드"),
            ]
        );
        assert_eq!(raw.rows[1][1], Value::text("KR5101888398"));
    }

    #[test]
    fn missing_table_is_absence() {
        let err = parse_fund_list("<html><body><p>검색 결과가 없습니다</p></body></html>").unwrap_err();
        assert!(err.is_absence());
    }

    #[test]
    fn headers_are_guarded() {
        let page = r#"<table class="tbl_fund"><tr><th>이름</th></tr></table>"#;
        assert!(matches!(parse_fund_list(page), Err(ParseError::HeaderMismatch { .. })));
    }

    #[test]
    fn fund_code_stops_at_next_param() {
        assert_eq!(fund_code("x?fundCd=ABC&tab=1"), Some("ABC"));
        assert_eq!(fund_code("x?fundCd="), None);
        assert_eq!(fund_code("x?y=1"), None);
    }
}
