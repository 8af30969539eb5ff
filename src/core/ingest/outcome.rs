//! Ingest outcomes and reporting
//!
//! Every top-level operation ends in an [`IngestOutcome`], whether it succeeded, partly
//! succeeded, failed or was interrupted. The CLI prints it as JSON and derives the exit
//! code from it.

use crate::core::normalize::{StitchReport, TableWrite};
use crate::domain::BazaarError;
use serde::Serialize;
use std::time::Duration;

/// Why an operation did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invalid configuration or input
    Configuration,
    /// Upstream API or database unreachable
    Connection,
    /// Shutdown signal received
    Interrupted,
    /// Any other failure
    Fatal,
}

impl FailureKind {
    /// Classify an error
    pub fn of(error: &BazaarError) -> Self {
        match error {
            _ if error.is_cancelled() => FailureKind::Interrupted,
            BazaarError::Configuration(_) | BazaarError::Validation(_) => {
                FailureKind::Configuration
            }
            BazaarError::Transport { .. } | BazaarError::Database(_) => FailureKind::Connection,
            BazaarError::PartialFetch { source, .. } => FailureKind::of(source),
            _ => FailureKind::Fatal,
        }
    }

    /// Process exit code
    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::Configuration => 2,
            FailureKind::Connection => 4,
            FailureKind::Fatal => 5,
            FailureKind::Interrupted => 130,
        }
    }
}

/// Structured result of a top-level operation
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Operation name, e.g. `pricing`
    pub operation: String,

    /// True when every table was written without soft failures
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Records fetched before shaping or normalization
    pub records_fetched: usize,

    /// Per-table results, main table first
    pub tables: Vec<TableWrite>,

    /// Dropped child rows, failed child tables and rejected inputs
    pub soft_failures: usize,

    /// Set when the operation did not complete
    pub failure: Option<FailureKind>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl IngestOutcome {
    /// Create an empty, successful outcome for `operation`
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            success: true,
            message: String::new(),
            records_fetched: 0,
            tables: Vec::new(),
            soft_failures: 0,
            failure: None,
            duration_ms: 0,
        }
    }

    /// Outcome for an operation that failed with `error`
    pub fn from_error(operation: impl Into<String>, error: &BazaarError) -> Self {
        let mut outcome = Self::new(operation);
        outcome.fail(FailureKind::of(error), error.to_string());
        outcome
    }

    /// Mark the operation as failed
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.success = false;
        self.failure = Some(kind);
        self.message = message.into();
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Record a single-table write
    pub fn add_table(&mut self, table: TableWrite) {
        if !table.is_success() {
            self.success = false;
        }
        self.tables.push(table);
    }

    /// Record the tables of a stitched write
    pub fn add_stitch_report(&mut self, report: StitchReport) {
        self.soft_failures += report.soft_failures();
        if !report.all_succeeded() || report.soft_failures() > 0 {
            self.success = false;
        }
        self.tables.push(report.main);
        self.tables.extend(report.children);
    }

    /// Count rejected inputs (invalid identifiers and the like)
    pub fn add_soft_failures(&mut self, count: usize) {
        if count > 0 {
            self.soft_failures += count;
            self.success = false;
        }
    }

    /// Rows written across every table
    pub fn rows_written(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_written).sum()
    }

    /// Process exit code: 0 success, 1 partial, otherwise the failure's code
    pub fn exit_code(&self) -> i32 {
        match self.failure {
            Some(kind) => kind.exit_code(),
            None if self.success => 0,
            None => 1,
        }
    }

    /// Fill in the summary message if none was set
    pub fn finish(mut self, duration: Duration) -> Self {
        if self.message.is_empty() {
            let failed = self.tables.iter().filter(|t| !t.is_success()).count();
            self.message = if self.success {
                format!(
                    "Wrote {} row(s) to {} table(s)",
                    self.rows_written(),
                    self.tables.len()
                )
            } else {
                format!(
                    "Wrote {} row(s); {} table(s) failed, {} soft failure(s)",
                    self.rows_written(),
                    failed,
                    self.soft_failures
                )
            };
        }
        self.with_duration(duration)
    }

    /// Log the outcome
    pub fn log_summary(&self) {
        if self.success {
            tracing::info!(
                operation = %self.operation,
                records_fetched = self.records_fetched,
                rows_written = self.rows_written(),
                tables = self.tables.len(),
                duration_ms = self.duration_ms,
                "Ingest completed"
            );
            return;
        }

        tracing::warn!(
            operation = %self.operation,
            failure = ?self.failure,
            soft_failures = self.soft_failures,
            message = %self.message,
            "Ingest completed with errors"
        );
        for table in self.tables.iter().filter(|t| !t.is_success()) {
            tracing::warn!(
                table = %table.table,
                error = table.error.as_deref().unwrap_or_default(),
                "Table write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportError;

    fn table(name: &str, rows: u64, error: Option<&str>) -> TableWrite {
        TableWrite {
            table: name.to_string(),
            rows_written: rows,
            rows_dropped: 0,
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_exit_codes() {
        let mut outcome = IngestOutcome::new("pages");
        assert_eq!(outcome.exit_code(), 0);

        outcome.add_table(table("t", 0, Some("boom")));
        assert_eq!(outcome.exit_code(), 1);

        let err = BazaarError::Configuration("missing".to_string());
        assert_eq!(IngestOutcome::from_error("pages", &err).exit_code(), 2);

        let err = BazaarError::PartialFetch {
            collected: 1,
            expected: 2,
            source: Box::new(BazaarError::Transport {
                attempts: 3,
                source: TransportError::Timeout("t".to_string()),
            }),
        };
        assert_eq!(IngestOutcome::from_error("pages", &err).exit_code(), 4);

        let err = BazaarError::Cancelled { collected: 0 };
        assert_eq!(IngestOutcome::from_error("pages", &err).exit_code(), 130);

        let err = BazaarError::Reconciliation("mismatch".to_string());
        assert_eq!(IngestOutcome::from_error("pricing", &err).exit_code(), 5);
    }

    #[test]
    fn test_finish_message() {
        let mut outcome = IngestOutcome::new("pages");
        outcome.add_table(table("orders", 12, None));
        let outcome = outcome.finish(Duration::from_millis(1500));

        assert!(outcome.success);
        assert_eq!(outcome.message, "Wrote 12 row(s) to 1 table(s)");
        assert_eq!(outcome.duration_ms, 1500);
    }

    #[test]
    fn test_serializes_failure_kind() {
        let err = BazaarError::Database("down".to_string());
        let json = serde_json::to_value(IngestOutcome::from_error("report", &err)).unwrap();
        assert_eq!(json["failure"], "connection");
        assert_eq!(json["success"], false);
    }
}
