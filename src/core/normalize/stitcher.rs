//! Foreign-key stitching between a persisted main table and its child tables
//!
//! The main table is written first. The durable identifiers of its rows are then mapped
//! back to the correlation keys the child rows carry:
//!
//! - [`ReconcileStrategy::Returning`] takes the identifiers straight from the insert.
//! - [`ReconcileStrategy::PositionalReadBack`] re-reads the newest identifiers of the main
//!   table and zips them with the keys by position. This degraded mode is only correct
//!   when no other writer inserted into the main table in between.
//!
//! Child tables are written concurrently with each other; a failing child table is
//! reported on its own and never undoes the main table or its siblings.
//!
//! Under [`PersistPolicy::Snapshot`] every table of the set is cleared before it is
//! written, so after a run the tables hold exactly that run's rows and every child
//! foreign key points at a main row written by the same run.

use super::normalizer::{ChildTable, NormalizedRecordSet};
use crate::adapters::database::{RelationalSink, WriteMode};
use crate::domain::{BazaarError, CorrelationKey, DurableId, Record, Result};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// How main-row identifiers are matched to correlation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileStrategy {
    /// Use the identifiers returned by the insert
    #[default]
    Returning,
    /// Re-read the newest identifiers and match them by position
    PositionalReadBack,
}

/// What happens to rows persisted by earlier runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    /// Replace the previous rows of every table in the set
    #[default]
    Snapshot,
    /// Keep earlier rows and append
    History,
}

impl PersistPolicy {
    fn write_mode(self) -> WriteMode {
        match self {
            PersistPolicy::Snapshot => WriteMode::AppendReplacingAll,
            PersistPolicy::History => WriteMode::Append,
        }
    }
}

/// Bijective mapping from correlation keys to durable identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    ids: HashMap<CorrelationKey, DurableId>,
}

impl KeyMap {
    /// Pair `keys` with `ids` by position
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::Reconciliation`] if the lengths differ or either side
    /// holds a duplicate.
    pub fn build(keys: &[CorrelationKey], ids: &[DurableId]) -> Result<Self> {
        if keys.len() != ids.len() {
            return Err(BazaarError::Reconciliation(format!(
                "{} correlation keys but {} durable identifiers",
                keys.len(),
                ids.len()
            )));
        }

        let mut seen_ids = HashSet::with_capacity(ids.len());
        let mut map = HashMap::with_capacity(keys.len());
        for (key, id) in keys.iter().zip(ids) {
            if !seen_ids.insert(*id) {
                return Err(BazaarError::Reconciliation(format!(
                    "durable identifier {id} assigned to more than one row"
                )));
            }
            if map.insert(*key, *id).is_some() {
                return Err(BazaarError::Reconciliation(format!(
                    "correlation key {key} appears more than once"
                )));
            }
        }

        Ok(Self { ids: map })
    }

    /// Durable identifier of `key`
    pub fn get(&self, key: &CorrelationKey) -> Option<DurableId> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Result of writing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWrite {
    pub table: String,
    pub rows_written: u64,
    /// Rows discarded because their correlation key had no durable identifier
    pub rows_dropped: usize,
    pub error: Option<String>,
}

impl TableWrite {
    fn ok(table: &str, rows_written: u64, rows_dropped: usize) -> Self {
        Self {
            table: table.to_string(),
            rows_written,
            rows_dropped,
            error: None,
        }
    }

    fn failed(table: &str, rows_dropped: usize, error: &BazaarError) -> Self {
        Self {
            table: table.to_string(),
            rows_written: 0,
            rows_dropped,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-table results of persisting a [`NormalizedRecordSet`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchReport {
    pub main: TableWrite,
    pub children: Vec<TableWrite>,
}

impl StitchReport {
    /// Dropped child rows plus failed child tables
    pub fn soft_failures(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.rows_dropped + usize::from(!c.is_success()))
            .sum()
    }

    pub fn all_succeeded(&self) -> bool {
        self.main.is_success() && self.children.iter().all(TableWrite::is_success)
    }
}

/// Persist the main table, stitch foreign keys and persist every child table
///
/// Table identities survive a snapshot, so identifiers keep increasing across runs.
/// A snapshot clears child tables even when this run has no rows for them.
///
/// # Errors
///
/// Fails only when the main table cannot be written or its identifiers cannot be
/// reconciled; child table failures are reported in the [`StitchReport`].
pub async fn persist_record_set(
    sink: &dyn RelationalSink,
    set: &NormalizedRecordSet,
    strategy: ReconcileStrategy,
    policy: PersistPolicy,
) -> Result<StitchReport> {
    let keys = set.main_keys();
    let main_rows = set.main_records();
    let mode = policy.write_mode();

    let ids = match strategy {
        ReconcileStrategy::Returning => {
            sink.insert_returning_ids(&set.main_table, &main_rows, &mode)
                .await?
        }
        ReconcileStrategy::PositionalReadBack => {
            tracing::warn!(
                table = %set.main_table,
                sink = sink.name(),
                "Reconciling main rows by position; concurrent writers would corrupt foreign keys"
            );
            let written = sink.write(&set.main_table, &main_rows, &mode).await?;
            if written as usize != main_rows.len() {
                return Err(BazaarError::Reconciliation(format!(
                    "sink reported {written} rows written for {} main rows",
                    main_rows.len()
                )));
            }
            if main_rows.is_empty() {
                Vec::new()
            } else {
                sink.read_back_ids(&set.main_table, main_rows.len()).await?
            }
        }
    };

    let key_map = KeyMap::build(&keys, &ids)?;
    let main = TableWrite::ok(&set.main_table, ids.len() as u64, 0);

    tracing::info!(
        table = %set.main_table,
        rows = key_map.len(),
        strategy = ?strategy,
        policy = ?policy,
        "Main table persisted"
    );

    let writes = set
        .children
        .iter()
        .map(|child| write_child(sink, child, &set.foreign_key_column, &key_map, &mode));
    let children = join_all(writes).await;

    Ok(StitchReport { main, children })
}

/// Attach foreign keys to `rows`, returning the stitched rows and how many were dropped
pub fn stitch_rows(
    child: &ChildTable,
    foreign_key_column: &str,
    key_map: &KeyMap,
) -> (Vec<Record>, usize) {
    let mut stitched = Vec::with_capacity(child.rows.len());
    let mut dropped = 0;

    for row in &child.rows {
        match key_map.get(&row.key) {
            Some(id) => {
                let mut record = row.record.clone();
                record.insert(foreign_key_column.to_string(), Value::from(id.value()));
                stitched.push(record);
            }
            None => dropped += 1,
        }
    }

    (stitched, dropped)
}

async fn write_child(
    sink: &dyn RelationalSink,
    child: &ChildTable,
    foreign_key_column: &str,
    key_map: &KeyMap,
    mode: &WriteMode,
) -> TableWrite {
    let (rows, dropped) = stitch_rows(child, foreign_key_column, key_map);
    if dropped > 0 {
        tracing::warn!(table = %child.table, dropped = dropped, "Dropped child rows without a parent");
    }

    if rows.is_empty() && *mode == WriteMode::Append {
        tracing::debug!(table = %child.table, "No child rows to write");
        return TableWrite::ok(&child.table, 0, dropped);
    }

    match sink.write(&child.table, &rows, mode).await {
        Ok(written) => {
            tracing::info!(table = %child.table, rows = written, "Child table persisted");
            TableWrite::ok(&child.table, written, dropped)
        }
        Err(e) => {
            tracing::error!(table = %child.table, error = %e, "Child table write failed");
            if *mode == WriteMode::AppendReplacingAll {
                // Rows left from an earlier run would point at main rows that are gone
                match sink.write(&child.table, &[], mode).await {
                    Ok(_) => tracing::warn!(table = %child.table, "Cleared child table after failed write"),
                    Err(clear) => tracing::error!(table = %child.table, error = %clear, "Could not clear child table"),
                }
            }
            TableWrite::failed(&child.table, dropped, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalizer::KeyedRow;
    use serde_json::json;

    fn keys(n: usize) -> Vec<CorrelationKey> {
        (0..n).map(CorrelationKey::new).collect()
    }

    fn ids(values: &[i64]) -> Vec<DurableId> {
        values.iter().copied().map(DurableId::new).collect()
    }

    #[test]
    fn test_key_map_is_bijective() {
        let map = KeyMap::build(&keys(3), &ids(&[10, 11, 12])).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&CorrelationKey::new(1)), Some(DurableId::new(11)));
    }

    #[test]
    fn test_key_map_rejects_count_mismatch() {
        let err = KeyMap::build(&keys(3), &ids(&[10, 11])).unwrap_err();
        assert!(matches!(err, BazaarError::Reconciliation(_)));
    }

    #[test]
    fn test_key_map_rejects_duplicate_ids() {
        let err = KeyMap::build(&keys(2), &ids(&[10, 10])).unwrap_err();
        assert!(matches!(err, BazaarError::Reconciliation(_)));
    }

    #[test]
    fn test_key_map_rejects_duplicate_keys() {
        let dup = vec![CorrelationKey::new(0), CorrelationKey::new(0)];
        assert!(KeyMap::build(&dup, &ids(&[1, 2])).is_err());
    }

    #[test]
    fn test_unmapped_child_rows_are_dropped() {
        let child = ChildTable {
            table: "prices".to_string(),
            rows: vec![
                KeyedRow {
                    key: CorrelationKey::new(0),
                    record: json!({"amount": 10}).as_object().cloned().unwrap(),
                },
                KeyedRow {
                    key: CorrelationKey::new(9),
                    record: json!({"amount": 12}).as_object().cloned().unwrap(),
                },
            ],
        };
        let map = KeyMap::build(&keys(1), &ids(&[77])).unwrap();

        let (rows, dropped) = stitch_rows(&child, "main_id", &map);
        assert_eq!(dropped, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("main_id"), Some(&json!(77)));
    }
}
