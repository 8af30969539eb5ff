//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Bazaar using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Bazaar - Marketplace ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(version, about, long_about = None)]
#[command(author = "Bazaar Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "bazaar.toml", env = "BAZAAR_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "BAZAAR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch competitive pricing for SKUs or competitor ASINs into linked tables
    Pricing(commands::pricing::PricingArgs),

    /// Fetch every page of a listing endpoint
    Pages(commands::pages::PagesArgs),

    /// Fetch one call per identifier
    Ids(commands::ids::IdsArgs),

    /// Run a bulk report over a date range
    Report(commands::report::ReportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
