//! Relational sink abstraction
//!
//! This module defines the trait that storage adapters implement to receive normalized
//! tables from Bazaar. Tables are schema-free from the caller's point of view: the
//! column set of a write is the union of its rows' keys.

use crate::domain::{DurableId, Record, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

/// Name of the identity column every sink table carries
pub const ROW_ID_COLUMN: &str = "row_id";

/// How a write treats rows already in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop and recreate the table from the written rows
    Replace,

    /// Add rows, widening the table with any new columns
    Append,

    /// Delete every existing row but keep the table and its identity sequence, then append
    AppendReplacingAll,

    /// Delete rows whose `column` falls within `start..=end`, then append
    AppendReplacingDateRange {
        /// Date or timestamp column compared against the range
        column: String,
        /// First day (inclusive)
        start: NaiveDate,
        /// Last day (inclusive)
        end: NaiveDate,
    },

    /// Delete rows whose `column` matches a value in the written rows, then append
    AppendReplacingIds {
        /// Identifier column
        column: String,
    },
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => f.write_str("replace"),
            WriteMode::Append => f.write_str("append"),
            WriteMode::AppendReplacingAll => f.write_str("append (replacing all rows)"),
            WriteMode::AppendReplacingDateRange { column, start, end } => {
                write!(f, "append (replacing {column} in {start}..={end})")
            }
            WriteMode::AppendReplacingIds { column } => {
                write!(f, "append (replacing matching {column})")
            }
        }
    }
}

/// Destination for normalized tables
///
/// Every write of a single call happens atomically; writes to the same table are never
/// issued concurrently by Bazaar.
#[async_trait]
pub trait RelationalSink: Send + Sync {
    /// Test the connection to the store
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Write `rows` to `table` under `mode`, returning the number of rows written
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::BazaarError::Persistence`] if the write fails; nothing
    /// from this call is kept in that case.
    async fn write(&self, table: &str, rows: &[Record], mode: &WriteMode) -> Result<u64> {
        Ok(self.insert_returning_ids(table, rows, mode).await?.len() as u64)
    }

    /// Write `rows` and return their durable identifiers in row order
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::BazaarError::Persistence`] if the write fails.
    async fn insert_returning_ids(
        &self,
        table: &str,
        rows: &[Record],
        mode: &WriteMode,
    ) -> Result<Vec<DurableId>>;

    /// The `count` most recently inserted identifiers of `table`, oldest first
    ///
    /// Only meaningful when no other writer touched the table since the last insert.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::BazaarError::Persistence`] if the read fails.
    async fn read_back_ids(&self, table: &str, count: usize) -> Result<Vec<DurableId>>;

    /// Short name for logs
    fn name(&self) -> &str;
}
