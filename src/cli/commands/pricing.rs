//! Pricing command implementation
//!
//! Fetches competitive pricing for the seller's SKUs, or for competitor ASINs, and
//! stores it as a main table plus rankings, offer-count and price child tables.

use super::{collect_identifiers, run_ingest, RunOptions};
use crate::adapters::reports::ItemType;
use crate::core::normalize::ReconcileStrategy;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the pricing command
#[derive(Args, Debug)]
pub struct PricingArgs {
    /// Identifier kind: `sku` for own listings, `asin` for competitors
    #[arg(long, default_value = "sku")]
    pub item_type: ItemType,

    /// SKUs or ASINs to look up (comma-separated)
    #[arg(long, alias = "asins", value_delimiter = ',')]
    pub items: Vec<String>,

    /// File with one identifier per line
    #[arg(long, value_name = "PATH")]
    pub items_file: Option<PathBuf>,

    /// Suffix appended to every table name, e.g. `_uk`
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Append to earlier pricing snapshots instead of replacing them
    #[arg(long)]
    pub keep_history: bool,

    /// Match main-table identifiers by re-reading the table (degraded mode)
    #[arg(long)]
    pub positional_reconcile: bool,

    /// Write to an in-memory sink instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl PricingArgs {
    /// Execute the pricing command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let items = match collect_identifiers(&self.items, self.items_file.as_deref()) {
            Ok(items) => items,
            Err(e) => {
                eprintln!("Failed to read identifier file: {e}");
                return Ok(2);
            }
        };
        if items.is_empty() {
            eprintln!("No identifiers given; use --items or --items-file");
            return Ok(2);
        }

        tracing::info!(
            item_type = %self.item_type,
            items = items.len(),
            suffix = %self.suffix,
            "Starting pricing command"
        );

        let options = RunOptions {
            dry_run: self.dry_run,
            strategy: if self.positional_reconcile {
                ReconcileStrategy::PositionalReadBack
            } else {
                ReconcileStrategy::Returning
            },
            keep_history: self.keep_history,
        };
        let item_type = self.item_type;
        let suffix = self.suffix.clone();

        run_ingest(config_path, options, shutdown_signal, "pricing", |coordinator| async move {
            coordinator
                .ingest_competitive_pricing(item_type, &items, &suffix)
                .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_pricing_defaults_to_skus() {
        let cli = Cli::try_parse_from(["bazaar", "pricing", "--items", "mug-01,mug-02"]).unwrap();
        match cli.command {
            Commands::Pricing(args) => {
                assert_eq!(args.item_type, ItemType::Sku);
                assert_eq!(args.items, vec!["mug-01", "mug-02"]);
                assert!(!args.keep_history);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_pricing_accepts_competitor_asins() {
        let cli = Cli::try_parse_from([
            "bazaar",
            "pricing",
            "--item-type",
            "asin",
            "--asins",
            "B000000001",
            "--keep-history",
        ])
        .unwrap();
        match cli.command {
            Commands::Pricing(args) => {
                assert_eq!(args.item_type, ItemType::Asin);
                assert_eq!(args.items, vec!["B000000001"]);
                assert!(args.keep_history);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
