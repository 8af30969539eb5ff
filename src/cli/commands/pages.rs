//! Pages command implementation
//!
//! Fetches every page of a listing endpoint through the worker pool and writes the
//! shaped rows to one table.

use super::{date_range, parse_key_value, run_ingest, RunOptions};
use crate::core::ingest::{Endpoint, ListingRequest};
use chrono::NaiveDate;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the pages command
#[derive(Args, Debug)]
pub struct PagesArgs {
    /// Endpoint to list (orders, refunds, products, logistics)
    pub endpoint: Endpoint,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Destination table (defaults to the endpoint's table)
    #[arg(long)]
    pub table: Option<String>,

    /// Fetch pages one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Extra call parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Write to an in-memory sink instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl PagesArgs {
    /// Build the listing request described by the arguments
    pub fn request(&self) -> Result<ListingRequest, String> {
        let mut request = ListingRequest::new(self.endpoint).sequential(self.sequential);
        if let Some((start, end)) = date_range(self.start, self.end)? {
            request = request.with_range(start, end);
        }
        if let Some(table) = &self.table {
            request = request.with_table(table.clone());
        }
        request.params.extend(self.params.iter().cloned());
        Ok(request)
    }

    /// Execute the pages command
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

        tracing::info!(endpoint = %self.endpoint, sequential = self.sequential, "Starting pages command");

        let options = RunOptions {
            dry_run: self.dry_run,
            ..RunOptions::default()
        };
        let operation = self.endpoint.to_string();

        run_ingest(config_path, options, shutdown_signal, &operation, |coordinator| async move {
            coordinator.ingest_listing(&request).await
        })
        .await
    }
}
