//! Row representation shared by the fetch, report, normalize and persistence layers

use serde_json::{Map, Value};

/// A single flat or nested row keyed by column/field name
pub type Record = Map<String, Value>;

/// Ordered union of the column names present across `rows`
///
/// Columns appear in first-seen order, so a schema-free table created from the rows has
/// a stable column layout.
pub fn column_union<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Text rendering of a JSON value for storage in a schema-free column
///
/// Nulls map to `None`; strings are stored as-is; lists and objects are stored as their
/// JSON text.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_column_union_first_seen_order() {
        let rows = vec![
            record(json!({"sku": "A", "price": 1})),
            record(json!({"sku": "B", "currency": "USD"})),
        ];
        assert_eq!(column_union(&rows), vec!["sku", "price", "currency"]);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(null)), None);
        assert_eq!(value_to_text(&json!("x")), Some("x".to_string()));
        assert_eq!(value_to_text(&json!(12.5)), Some("12.5".to_string()));
        assert_eq!(value_to_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_text(&json!([1, 2])), Some("[1,2]".to_string()));
    }
}
