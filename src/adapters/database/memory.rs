//! In-memory relational sink
//!
//! Used for dry runs and tests. Behaves like the PostgreSQL sink: identifiers are
//! assigned in insertion order and every call is all-or-nothing.

use super::traits::{RelationalSink, WriteMode};
use crate::core::normalize::shaping::parse_timestamp;
use crate::domain::record::value_to_text;
use crate::domain::{BazaarError, DurableId, Record, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<(DurableId, Record)>,
    next_id: i64,
}

/// Relational sink that keeps tables in process memory
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, MemoryTable>>,
    failing: HashSet<String>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `table` fail
    pub fn failing_on(mut self, table: impl Into<String>) -> Self {
        self.failing.insert(table.into());
        self
    }

    /// Rows currently stored in `table`, in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.rows.iter().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default()
    }

    /// Identifiers currently stored in `table`, in insertion order
    pub async fn ids(&self, table: &str) -> Vec<DurableId> {
        self.tables
            .lock()
            .await
            .get(table)
            .map(|t| t.rows.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    /// Names of every table written so far
    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RelationalSink for MemorySink {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_returning_ids(
        &self,
        table: &str,
        rows: &[Record],
        mode: &WriteMode,
    ) -> Result<Vec<DurableId>> {
        if self.failing.contains(table) {
            return Err(BazaarError::persistence(table, "simulated write failure"));
        }

        let mut tables = self.tables.lock().await;
        if rows.is_empty() && !tables.contains_key(table) {
            return Ok(Vec::new());
        }
        let entry = tables.entry(table.to_string()).or_default();

        match mode {
            WriteMode::Replace => *entry = MemoryTable::default(),
            WriteMode::Append => {}
            WriteMode::AppendReplacingAll => entry.rows.clear(),
            WriteMode::AppendReplacingDateRange { column, start, end } => {
                entry.rows.retain(|(_, row)| {
                    let day = row
                        .get(column)
                        .and_then(|v| v.as_str())
                        .and_then(parse_timestamp)
                        .map(|ts| ts.date_naive());
                    !day.is_some_and(|d| d >= *start && d <= *end)
                });
            }
            WriteMode::AppendReplacingIds { column } => {
                let incoming: HashSet<String> = rows
                    .iter()
                    .filter_map(|r| r.get(column).and_then(value_to_text))
                    .collect();
                entry.rows.retain(|(_, row)| {
                    !row.get(column)
                        .and_then(value_to_text)
                        .is_some_and(|v| incoming.contains(&v))
                });
            }
        }

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            entry.next_id += 1;
            let id = DurableId::new(entry.next_id);
            entry.rows.push((id, row.clone()));
            ids.push(id);
        }

        tracing::debug!(table = table, rows = ids.len(), mode = %mode, "In-memory write");
        Ok(ids)
    }

    async fn read_back_ids(&self, table: &str, count: usize) -> Result<Vec<DurableId>> {
        let tables = self.tables.lock().await;
        let Some(entry) = tables.get(table) else {
            return Err(BazaarError::persistence(table, "table does not exist"));
        };
        let skip = entry.rows.len().saturating_sub(count);
        Ok(entry.rows.iter().skip(skip).map(|(id, _)| *id).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_ids_follow_insertion_order() {
        let sink = MemorySink::new();
        let rows = vec![row(json!({"sku": "A"})), row(json!({"sku": "B"}))];

        let first = sink.insert_returning_ids("t", &rows, &WriteMode::Append).await.unwrap();
        let second = sink.insert_returning_ids("t", &rows, &WriteMode::Append).await.unwrap();

        assert_eq!(first, vec![DurableId::new(1), DurableId::new(2)]);
        assert_eq!(second, vec![DurableId::new(3), DurableId::new(4)]);
        assert_eq!(sink.read_back_ids("t", 2).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_replace_resets_table() {
        let sink = MemorySink::new();
        let rows = vec![row(json!({"sku": "A"}))];
        sink.write("t", &rows, &WriteMode::Append).await.unwrap();
        sink.write("t", &rows, &WriteMode::Replace).await.unwrap();
        assert_eq!(sink.rows("t").await.len(), 1);
        assert_eq!(sink.ids("t").await, vec![DurableId::new(1)]);
    }

    #[tokio::test]
    async fn test_replacing_all_keeps_identity_sequence() {
        let sink = MemorySink::new();
        let rows = vec![row(json!({"sku": "A"})), row(json!({"sku": "B"}))];
        sink.write("t", &rows, &WriteMode::Append).await.unwrap();

        let ids = sink
            .insert_returning_ids("t", &rows[..1], &WriteMode::AppendReplacingAll)
            .await
            .unwrap();
        assert_eq!(ids, vec![DurableId::new(3)]);
        assert_eq!(sink.rows("t").await.len(), 1);

        sink.write("t", &[], &WriteMode::AppendReplacingAll).await.unwrap();
        assert!(sink.rows("t").await.is_empty());

        sink.write("never_written", &[], &WriteMode::AppendReplacingAll)
            .await
            .unwrap();
        assert_eq!(sink.table_names().await, vec!["t"]);
    }

    #[tokio::test]
    async fn test_date_range_pre_delete() {
        let sink = MemorySink::new();
        let existing = vec![
            row(json!({"day": "2025-01-05T10:00:00Z", "v": 1})),
            row(json!({"day": "2025-02-05T10:00:00Z", "v": 2})),
        ];
        sink.write("t", &existing, &WriteMode::Append).await.unwrap();

        let mode = WriteMode::AppendReplacingDateRange {
            column: "day".to_string(),
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        };
        let fresh = vec![row(json!({"day": "2025-01-06T00:00:00Z", "v": 3}))];
        sink.write("t", &fresh, &mode).await.unwrap();

        let values: Vec<i64> = sink
            .rows("t")
            .await
            .iter()
            .map(|r| r["v"].as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_id_list_pre_delete() {
        let sink = MemorySink::new();
        sink.write(
            "t",
            &[row(json!({"logisticsId": "L1", "v": 1})), row(json!({"logisticsId": "L2", "v": 2}))],
            &WriteMode::Append,
        )
        .await
        .unwrap();

        let mode = WriteMode::AppendReplacingIds {
            column: "logisticsId".to_string(),
        };
        sink.write("t", &[row(json!({"logisticsId": "L1", "v": 9}))], &mode)
            .await
            .unwrap();

        let rows = sink.rows("t").await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["logisticsId"], "L2");
        assert_eq!(rows[1]["v"], 9);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let sink = MemorySink::new().failing_on("bad");
        let err = sink
            .write("bad", &[row(json!({"a": 1}))], &WriteMode::Append)
            .await
            .unwrap_err();
        assert!(matches!(err, BazaarError::Persistence { .. }));
        assert!(sink.table_names().await.is_empty());
    }
}
