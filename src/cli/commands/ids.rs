//! Ids command implementation
//!
//! Issues one call per identifier through the worker pool, e.g. logistics details for
//! a list of order IDs.

use super::{collect_identifiers, parse_key_value, run_ingest, RunOptions};
use crate::core::ingest::{Endpoint, ListingRequest};
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the ids command
#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Endpoint to query per identifier
    #[arg(default_value = "logistics")]
    pub endpoint: Endpoint,

    /// Identifiers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,

    /// File with one identifier per line
    #[arg(long, value_name = "PATH")]
    pub ids_file: Option<PathBuf>,

    /// Destination table (defaults to the endpoint's table)
    #[arg(long)]
    pub table: Option<String>,

    /// Extra call parameter (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Write to an in-memory sink instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl IdsArgs {
    /// Execute the ids command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let ids = match collect_identifiers(&self.ids, self.ids_file.as_deref()) {
            Ok(ids) => ids,
            Err(e) => {
                eprintln!("Failed to read identifier file: {e}");
                return Ok(2);
            }
        };
        if ids.is_empty() {
            eprintln!("No identifiers supplied; use --ids or --ids-file");
            return Ok(2);
        }

        tracing::info!(endpoint = %self.endpoint, ids = ids.len(), "Starting ids command");

        let mut request = ListingRequest::new(self.endpoint);
        if let Some(table) = &self.table {
            request = request.with_table(table.clone());
        }
        request.params.extend(self.params.iter().cloned());

        let options = RunOptions {
            dry_run: self.dry_run,
            ..RunOptions::default()
        };
        let operation = format!("{}-by-id", self.endpoint);

        run_ingest(config_path, options, shutdown_signal, &operation, |coordinator| async move {
            coordinator.ingest_by_ids(&request, &ids).await
        })
        .await
    }
}
