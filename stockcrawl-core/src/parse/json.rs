//! JSON arrays of flat objects.

use super::{cell, ParseError, RawTable};
use crate::table::Value;

/// Parse the array at `pointer` (RFC 6901, `""` is the root) into a raw table.
///
/// Columns are the union of object keys in first-seen order; keys missing from
/// an object become nulls.
pub fn parse_records(payload: &str, pointer: &str) -> Result<RawTable, ParseError> {
    let doc: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| ParseError::Json(e.to_string()))?;
    let node = doc
        .pointer(pointer)
        .ok_or_else(|| ParseError::MissingPath(pointer.to_string()))?;
    let items = node
        .as_array()
        .ok_or_else(|| ParseError::NotRecords(pointer.to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        let obj = item
            .as_object()
            .ok_or_else(|| ParseError::NotRecords(pointer.to_string()))?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(json_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => cell(s.trim().to_string()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_array_of_objects() {
        let payload = r#"[
            {"symb":"SPI@SPX","xymd":"20200331","clos":2584.59,"gvol":0},
            {"symb":"SPI@SPX","xymd":"20200330","clos":2626.65}
        ]"#;
        let raw = parse_records(payload, "").unwrap();
        assert_eq!(raw.columns, vec!["symb", "xymd", "clos", "gvol"]);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.rows[0][2], Value::Number(2584.59));
        assert_eq!(raw.rows[0][3], Value::Int(0));
        assert_eq!(raw.rows[1][3], Value::Null);
    }

    #[test]
    fn later_keys_are_appended_in_payload_order() {
        let payload = r#"[{"zeta":1,"alpha":2},{"mid":3,"zeta":4}]"#;
        let raw = parse_records(payload, "").unwrap();
        assert_eq!(raw.columns, vec!["zeta", "alpha", "mid"]);
        assert_eq!(raw.rows[1], vec![Value::Int(4), Value::Null, Value::Int(3)]);
    }

    #[test]
    fn empty_array_is_an_empty_table() {
        let raw = parse_records("[]", "").unwrap();
        assert!(raw.is_empty());
        assert!(raw.columns.is_empty());
    }

    #[test]
    fn nested_pointer() {
        let payload = r#"{"resultCode":"success","result":{"etfItemList":[
            {"itemcode":"069500","itemname":"KODEX 200","marketSum":"51,234"}
        ]}}"#;
        let raw = parse_records(payload, "/result/etfItemList").unwrap();
        assert_eq!(raw.rows[0][0], Value::text("069500"));
    }

    #[test]
    fn errors_are_specific() {
        assert!(matches!(parse_records("<html>", ""), Err(ParseError::Json(_))));
        assert!(matches!(
            parse_records(r#"{"a":1}"#, "/b"),
            Err(ParseError::MissingPath(_))
        ));
        assert!(matches!(
            parse_records(r#"{"a":1}"#, "/a"),
            Err(ParseError::NotRecords(_))
        ));
        assert!(matches!(parse_records("[1,2]", ""), Err(ParseError::NotRecords(_))));
    }
}
