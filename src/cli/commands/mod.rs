//! CLI command implementations
//!
//! Ingest commands share [`run_ingest`]: load the configuration, build the coordinator,
//! run the operation inside [`guard`] and print the outcome as JSON.

pub mod ids;
pub mod init;
pub mod pages;
pub mod pricing;
pub mod report;
pub mod validate;

use crate::config::load_config;
use crate::core::ingest::{guard, IngestCoordinator, IngestOutcome};
use crate::core::normalize::ReconcileStrategy;
use crate::domain::Result;
use crate::logging::ingest_span;
use chrono::NaiveDate;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// Settings shared by every ingest command
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Write to the in-memory sink
    pub dry_run: bool,
    /// How main-table identifiers are reconciled
    pub strategy: ReconcileStrategy,
    /// Append competitive pricing snapshots instead of replacing the previous one
    pub keep_history: bool,
}

/// Load configuration, build the coordinator and run `operation`
///
/// Returns the process exit code.
pub async fn run_ingest<F, Fut>(
    config_path: &str,
    options: RunOptions,
    shutdown: watch::Receiver<bool>,
    operation: &str,
    run: F,
) -> anyhow::Result<i32>
where
    F: FnOnce(Arc<IngestCoordinator>) -> Fut,
    Fut: Future<Output = Result<IngestOutcome>> + Send + 'static,
{
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("Configuration error: {e}");
            return Ok(2);
        }
    };

    if options.dry_run {
        tracing::info!("Enabling dry-run mode from CLI");
        config.application.dry_run = true;
    }
    if options.keep_history {
        if let Some(reports) = config.reports.as_mut() {
            reports.pricing_history = true;
        }
    }

    let coordinator = match IngestCoordinator::from_config(&config, shutdown).await {
        Ok(c) => Arc::new(c.with_reconcile_strategy(options.strategy)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize ingest");
            let outcome = IngestOutcome::from_error(operation, &e);
            print_outcome(&outcome)?;
            return Ok(outcome.exit_code());
        }
    };

    let outcome = guard(operation, run(coordinator))
        .instrument(ingest_span(operation))
        .await;
    outcome.log_summary();
    print_outcome(&outcome)?;
    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &IngestOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// Parse a `key=value` argument
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Expected key=value, got '{raw}'")),
    }
}

/// Combine optional `--start`/`--end` into an inclusive range
pub fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> std::result::Result<Option<(NaiveDate, NaiveDate)>, String> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) if start <= end => Ok(Some((start, end))),
        (Some(start), Some(end)) => Err(format!("--start {start} is after --end {end}")),
        _ => Err("--start and --end must be given together".to_string()),
    }
}

/// Identifiers from a comma-separated list plus an optional file, one per line
pub fn collect_identifiers(
    inline: &[String],
    file: Option<&Path>,
) -> std::io::Result<Vec<String>> {
    let mut ids: Vec<String> = inline
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)?;
        ids.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    Ok(ids)
}
