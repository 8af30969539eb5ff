//! Projection of nested items into a main table and child tables

use super::schema::{Projection, STAMP_COLUMN};
use crate::domain::{CorrelationKey, Record};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A row waiting for persistence, tagged with its main row's correlation key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRow {
    pub key: CorrelationKey,
    pub record: Record,
}

/// Rows of one child table
#[derive(Debug, Clone, PartialEq)]
pub struct ChildTable {
    pub table: String,
    pub rows: Vec<KeyedRow>,
}

/// Main table plus child tables, linked by correlation keys
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecordSet {
    pub main_table: String,
    pub foreign_key_column: String,
    pub main: Vec<KeyedRow>,
    pub children: Vec<ChildTable>,
}

impl NormalizedRecordSet {
    /// Correlation keys of the main rows, in insertion order
    pub fn main_keys(&self) -> Vec<CorrelationKey> {
        self.main.iter().map(|r| r.key).collect()
    }

    /// Main rows without their keys, in insertion order
    pub fn main_records(&self) -> Vec<Record> {
        self.main.iter().map(|r| r.record.clone()).collect()
    }

    /// Total number of child rows across all child tables
    pub fn child_row_count(&self) -> usize {
        self.children.iter().map(|c| c.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }
}

/// Normalize `items` with `projection`, stamping every row with `stamp`
///
/// Each item becomes one main row whose correlation key is its position in `items`.
/// Non-object elements of child lists are ignored.
pub fn normalize(
    projection: &Projection,
    items: &[Value],
    stamp: DateTime<Utc>,
) -> NormalizedRecordSet {
    let stamp = Value::String(stamp.to_rfc3339_opts(SecondsFormat::Secs, true));

    let mut main = Vec::with_capacity(items.len());
    let mut children: Vec<ChildTable> = projection
        .children
        .iter()
        .map(|c| ChildTable {
            table: c.table.clone(),
            rows: Vec::new(),
        })
        .collect();

    for (position, item) in items.iter().enumerate() {
        let key = CorrelationKey::new(position);

        let mut record = Record::new();
        for column in &projection.main_columns {
            column.project(item, &mut record);
        }
        record.insert(STAMP_COLUMN.to_string(), stamp.clone());
        main.push(KeyedRow { key, record });

        for (spec, table) in projection.children.iter().zip(children.iter_mut()) {
            let Some(Value::Array(elements)) = spec.list_path.resolve(item) else {
                continue;
            };

            for element in elements.iter().filter(|e| e.is_object()) {
                let mut row = Record::new();
                for column in &projection.inherited_columns {
                    column.project(item, &mut row);
                }
                for column in &spec.columns {
                    column.project(element, &mut row);
                }
                row.insert(STAMP_COLUMN.to_string(), stamp.clone());
                table.rows.push(KeyedRow { key, record: row });
            }
        }
    }

    tracing::debug!(
        main_table = %projection.main_table,
        main_rows = main.len(),
        child_rows = children.iter().map(|c| c.rows.len()).sum::<usize>(),
        "Normalized record set"
    );

    NormalizedRecordSet {
        main_table: projection.main_table.clone(),
        foreign_key_column: projection.foreign_key_column.clone(),
        main,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn item(sku: &str, prices: usize) -> Value {
        let prices: Vec<Value> = (0..prices)
            .map(|i| {
                json!({
                    "condition": "New",
                    "belongsToRequester": i == 0,
                    "Price": {
                        "ListingPrice": {"Amount": 10 + i, "CurrencyCode": "USD"},
                        "Shipping": {"Amount": 0, "CurrencyCode": "USD"}
                    }
                })
            })
            .collect();
        json!({
            "SellerSKU": sku,
            "status": "Success",
            "Product": {
                "Identifiers": {"MarketplaceASIN": {"MarketplaceId": "ATVPDKIKX0DER", "ASIN": "B000000001"}},
                "CompetitivePricing": {
                    "CompetitivePrices": prices,
                    "NumberOfOfferListings": [{"condition": "New", "Count": 3}]
                },
                "SalesRankings": [{"ProductCategoryId": "toy", "Rank": 42}, "noise"]
            }
        })
    }

    #[test]
    fn test_main_projection() {
        let set = normalize(&Projection::competitive_pricing(""), &[item("X1", 1)], stamp());

        let main = &set.main[0].record;
        assert_eq!(main.get("SellerSKU"), Some(&json!("X1")));
        assert_eq!(
            main.get("Product.Identifiers.MarketplaceASIN.ASIN"),
            Some(&json!("B000000001"))
        );
        assert_eq!(main.get("created_at"), Some(&json!("2025-03-01T08:00:00Z")));
        assert!(!main.contains_key("Product.Identifiers.SKUIdentifier.SellerId"));
    }

    #[test]
    fn test_child_rows_carry_parent_key_and_columns() {
        let set = normalize(
            &Projection::competitive_pricing(""),
            &[item("X1", 2), item("X2", 1)],
            stamp(),
        );

        let prices = &set.children[2];
        assert_eq!(prices.table, "competitive_prices");
        assert_eq!(prices.rows.len(), 3);
        assert_eq!(prices.rows[0].key, CorrelationKey::new(0));
        assert_eq!(prices.rows[1].key, CorrelationKey::new(0));
        assert_eq!(prices.rows[2].key, CorrelationKey::new(1));
        assert_eq!(prices.rows[1].record.get("price_amount"), Some(&json!(11)));
        assert_eq!(prices.rows[2].record.get("seller_sku"), Some(&json!("X2")));

        let rankings = &set.children[0];
        assert_eq!(rankings.rows.len(), 2);
        assert_eq!(rankings.rows[0].record.get("rank"), Some(&json!(42)));
    }

    #[test]
    fn test_correlation_keys_are_injective() {
        let items: Vec<Value> = (0..25).map(|i| item(&format!("S{i}"), i % 3)).collect();
        let set = normalize(&Projection::competitive_pricing(""), &items, stamp());

        let keys: HashSet<CorrelationKey> = set.main_keys().into_iter().collect();
        assert_eq!(keys.len(), items.len());
        for child in &set.children {
            assert!(child.rows.iter().all(|r| keys.contains(&r.key)));
        }
    }

    #[test]
    fn test_empty_input() {
        let set = normalize(&Projection::competitive_pricing(""), &[], stamp());
        assert!(set.is_empty());
        assert_eq!(set.child_row_count(), 0);
        assert_eq!(set.children.len(), 3);
    }
}
