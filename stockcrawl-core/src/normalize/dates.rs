//! Date text as the upstream pages print it.

use chrono::{Datelike, NaiveDate};

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

fn two_digit_year(yy: &str) -> Option<i32> {
    let yy: i32 = yy.parse().ok()?;
    Some(if yy < 70 { 2000 + yy } else { 1900 + yy })
}

/// Parse `YYYYMMDD`, `YYYY.MM.DD`, `YYYY-MM-DD`, `YYYY/MM/DD`, and the
/// two-digit-year forms `YY/MM/DD` and `YY.MM.DD`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim().trim_end_matches('.');
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return ymd(s[..4].parse().ok()?, &s[4..6], &s[6..8]);
    }
    let parts: Vec<&str> = s.split(['.', '-', '/']).map(str::trim).collect();
    let [y, m, d] = parts.as_slice() else {
        return None;
    };
    if !y.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match y.len() {
        4 => ymd(y.parse().ok()?, m, d),
        2 => ymd(two_digit_year(y)?, m, d),
        _ => None,
    }
}

/// Last day of the month named by a `YYYY.MM` or `YYYY/MM` prefix.
///
/// Anything after the month (`(E)`, a day part) is ignored.
pub fn month_end(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    let year: i32 = s.get(..4)?.parse().ok()?;
    let sep = s.get(4..5)?;
    if sep != "." && sep != "/" {
        return None;
    }
    let month: u32 = s.get(5..7)?.parse().ok()?;
    last_day_of_month(year, month)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Whole months elapsed from `start` to `end`, zero if `end` is earlier.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0)
}
