//! Record shaping for list endpoints
//!
//! Order and refund listings come back as deeply nested objects. Before they reach the
//! sink they are reduced to flat rows: nested objects become dotted column names, a
//! chosen list field can be exploded into one row per element, and timestamp columns
//! are normalized to RFC 3339 UTC.

use crate::domain::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Flatten nested objects into dotted keys
///
/// Arrays are kept as values. A non-object input becomes a single `value` column.
///
/// # Examples
///
/// ```
/// use bazaar::core::normalize::shaping::flatten_record;
/// use serde_json::json;
///
/// let row = flatten_record(&json!({"baseInfo": {"id": 7, "buyer": {"name": "li"}}}));
/// assert_eq!(row["baseInfo.id"], json!(7));
/// assert_eq!(row["baseInfo.buyer.name"], json!("li"));
/// ```
pub fn flatten_record(value: &Value) -> Record {
    let mut result = Map::new();
    match value {
        Value::Object(_) => flatten_recursive(value, String::new(), &mut result),
        other => {
            result.insert("value".to_string(), other.clone());
        }
    }
    result
}

fn flatten_recursive(value: &Value, prefix: String, result: &mut Record) {
    match value {
        Value::Object(map) if !map.is_empty() || prefix.is_empty() => {
            for (key, val) in map {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_recursive(val, new_prefix, result);
            }
        }
        // An empty nested object contributes no columns
        Value::Object(_) => {}
        _ => {
            result.insert(prefix, value.clone());
        }
    }
}

/// Replace a list-valued field with its first element
///
/// An empty list (or a missing field) becomes an empty object, so flattening adds no
/// columns for it.
pub fn take_first_element(record: &mut Value, field: &str) {
    let Some(map) = record.as_object_mut() else {
        return;
    };
    if let Some(Value::Array(items)) = map.get_mut(field) {
        let first = if items.is_empty() {
            Value::Object(Map::new())
        } else {
            items.swap_remove(0)
        };
        map.insert(field.to_string(), first);
    }
}

/// Emit one record per element of the list stored in `field`
///
/// Records where `field` is an empty list keep a single row with `null` in its place.
/// Records where `field` is absent or not a list pass through unchanged.
pub fn explode(records: Vec<Value>, field: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let items = match record.get(field) {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                out.push(record);
                continue;
            }
        };

        if items.is_empty() {
            let mut row = record;
            if let Some(map) = row.as_object_mut() {
                map.insert(field.to_string(), Value::Null);
            }
            out.push(row);
            continue;
        }

        for item in items {
            let mut row = record.clone();
            if let Some(map) = row.as_object_mut() {
                map.insert(field.to_string(), item);
            }
            out.push(row);
        }
    }
    out
}

/// Rewrite timestamp columns as RFC 3339 UTC strings
///
/// Unparseable values become `null`.
pub fn coerce_timestamps(row: &mut Record, columns: &[String]) {
    for column in columns {
        if let Some(value) = row.get_mut(column) {
            let parsed = value.as_str().and_then(parse_timestamp);
            *value = match parsed {
                Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
                None => Value::Null,
            };
        }
    }
}

/// Parse the timestamp formats seen in marketplace payloads
///
/// Accepts RFC 3339, the compact `yyyyMMddHHmmssSSS+zzzz` gateway form, naive
/// `yyyy-MM-dd HH:mm:ss` (taken as UTC) and plain dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y%m%d%H%M%S%3f%z", "%Y%m%d%H%M%S%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Per-endpoint shaping applied before rows reach the sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapingOptions {
    /// List fields replaced by their first element
    pub first_element: Vec<String>,
    /// List field exploded into one row per element
    pub explode: Option<String>,
    /// Flattened columns coerced to RFC 3339 UTC
    pub timestamp_columns: Vec<String>,
    /// Column used for date-range pre-deletes
    pub date_column: Option<String>,
}

impl ShapingOptions {
    /// Buyer order listings: first trade term, one row per product item
    pub fn orders() -> Self {
        Self {
            first_element: vec!["tradeTerms".to_string()],
            explode: Some("productItems".to_string()),
            timestamp_columns: [
                "baseInfo.createTime",
                "baseInfo.modifyTime",
                "baseInfo.payTime",
                "baseInfo.allDeliveredTime",
                "baseInfo.completeTime",
            ]
            .map(String::from)
            .to_vec(),
            date_column: Some("baseInfo.createTime".to_string()),
        }
    }

    /// Buyer refund listings
    pub fn refunds() -> Self {
        Self {
            first_element: Vec::new(),
            explode: None,
            timestamp_columns: [
                "gmtApply",
                "gmtCompleted",
                "gmtCreate",
                "gmtModified",
                "gmtTimeOut",
            ]
            .map(String::from)
            .to_vec(),
            date_column: Some("gmtCreate".to_string()),
        }
    }

    /// Shape raw records into flat rows
    pub fn apply(&self, records: Vec<Value>) -> Vec<Record> {
        let mut records = records;
        for field in &self.first_element {
            for record in records.iter_mut() {
                take_first_element(record, field);
            }
        }

        if let Some(field) = &self.explode {
            records = explode(records, field);
        }

        records
            .iter()
            .map(|record| {
                let mut row = flatten_record(record);
                coerce_timestamps(&mut row, &self.timestamp_columns);
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_keeps_arrays_and_skips_empty_objects() {
        let row = flatten_record(&json!({
            "a": {"b": 1, "c": {"d": "x"}},
            "tags": [1, 2],
            "empty": {}
        }));
        assert_eq!(row["a.b"], json!(1));
        assert_eq!(row["a.c.d"], json!("x"));
        assert_eq!(row["tags"], json!([1, 2]));
        assert!(!row.contains_key("empty"));
    }

    #[test]
    fn test_flatten_scalar() {
        let row = flatten_record(&json!(5));
        assert_eq!(row["value"], json!(5));
    }

    #[test]
    fn test_take_first_element() {
        let mut record = json!({"tradeTerms": [{"phase": 1}, {"phase": 2}]});
        take_first_element(&mut record, "tradeTerms");
        assert_eq!(record["tradeTerms"], json!({"phase": 1}));

        let mut record = json!({"tradeTerms": []});
        take_first_element(&mut record, "tradeTerms");
        assert_eq!(record["tradeTerms"], json!({}));
    }

    #[test]
    fn test_explode() {
        let records = vec![
            json!({"id": 1, "productItems": [{"sku": "a"}, {"sku": "b"}]}),
            json!({"id": 2, "productItems": []}),
            json!({"id": 3}),
        ];
        let rows = explode(records, "productItems");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["productItems"]["sku"], "a");
        assert_eq!(rows[1]["productItems"]["sku"], "b");
        assert_eq!(rows[1]["id"], 1);
        assert_eq!(rows[2]["productItems"], Value::Null);
        assert_eq!(rows[3]["id"], 3);
    }

    #[test]
    fn test_parse_gateway_timestamp() {
        let ts = parse_timestamp("20250115083000000+0800").unwrap();
        assert_eq!(ts.to_rfc3339_opts(SecondsFormat::Secs, true), "2025-01-15T00:30:00Z");
    }

    #[test]
    fn test_parse_other_formats() {
        assert!(parse_timestamp("2025-01-15T08:30:00+08:00").is_some());
        assert!(parse_timestamp("2025-01-15 08:30:00").is_some());
        assert!(parse_timestamp("2025-01-15").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_coerce_timestamps() {
        let mut row = flatten_record(&json!({
            "gmtCreate": "20250115083000000+0800",
            "gmtModified": "garbage",
            "other": "20250115083000000+0800"
        }));
        coerce_timestamps(&mut row, &["gmtCreate".to_string(), "gmtModified".to_string()]);
        assert_eq!(row["gmtCreate"], json!("2025-01-15T00:30:00Z"));
        assert_eq!(row["gmtModified"], Value::Null);
        assert_eq!(row["other"], json!("20250115083000000+0800"));
    }

    #[test]
    fn test_order_shaping() {
        let records = vec![json!({
            "baseInfo": {"id": 1, "createTime": "20250115083000000+0800"},
            "tradeTerms": [{"phase": 1}, {"phase": 2}],
            "productItems": [{"skuID": "a"}, {"skuID": "b"}]
        })];
        let rows = ShapingOptions::orders().apply(records);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["tradeTerms.phase"], json!(1));
        assert_eq!(rows[1]["productItems.skuID"], json!("b"));
        assert_eq!(rows[0]["baseInfo.createTime"], json!("2025-01-15T00:30:00Z"));
    }
}
