//! Report command implementation
//!
//! Runs a bulk report over a date range (one report per window) or a single undated
//! report, and writes the decoded rows to one table.

use super::{date_range, parse_key_value, run_ingest, RunOptions};
use crate::core::ingest::ReportIngest;
use crate::core::report::ContentShape;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use tokio::sync::watch;

/// Declared content shape of the report document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Tab-delimited table with a header row
    Tsv,
    /// JSON records under a named key
    Json,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report type, e.g. GET_SALES_AND_TRAFFIC_REPORT
    pub report_type: String,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Report option (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Document content shape
    #[arg(long, value_enum, default_value_t = ReportFormat::Tsv)]
    pub format: ReportFormat,

    /// Key holding the records when the format is json
    #[arg(long, default_value = "dataByAsin")]
    pub json_key: String,

    /// Destination table
    #[arg(long)]
    pub table: String,

    /// Column used to replace rows previously loaded for the same range
    #[arg(long)]
    pub date_column: Option<String>,

    /// Write to an in-memory sink instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl ReportArgs {
    /// Build the report request described by the arguments
    pub fn request(&self) -> Result<ReportIngest, String> {
        let shape = match self.format {
            ReportFormat::Tsv => ContentShape::tsv(),
            ReportFormat::Json => ContentShape::json(self.json_key.clone()),
        };

        Ok(ReportIngest {
            report_type: self.report_type.clone(),
            range: date_range(self.start, self.end)?,
            options: self.options.iter().cloned().collect(),
            shape,
            table: self.table.clone(),
            date_column: self.date_column.clone(),
        })
    }

    /// Execute the report command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let request = match self.request() {
            Ok(request) => request,
            Err(e) => {
                eprintln!("Invalid arguments: {e}");
                return Ok(2);
            }
        };

        tracing::info!(report_type = %self.report_type, table = %self.table, "Starting report command");

        let options = RunOptions {
            dry_run: self.dry_run,
            ..RunOptions::default()
        };

        run_ingest(config_path, options, shutdown_signal, "report", |coordinator| async move {
            coordinator.ingest_bulk_report(&request).await
        })
        .await
    }
}
