//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Bazaar configuration file.

use crate::adapters::postgresql::client::connection_string_safe;
use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Marketplace: {}", config.marketplace.base_url);
        println!("  App Key: {}", config.marketplace.app_key);
        println!(
            "  App Secret: {}",
            config.marketplace.app_secret.expose_secret().hint()
        );
        match &config.marketplace.access_token {
            Some(token) => println!("  Access Token: {}", token.expose_secret().hint()),
            None => println!("  Access Token: none"),
        }
        println!(
            "  Retries: {} (base {})",
            config.marketplace.retry.max_attempts, config.marketplace.retry.backoff_base
        );
        println!("  Workers: {}", config.fetch.max_workers);
        println!("  Page Size: {}", config.fetch.page_size);
        match config.fetch.max_limit {
            Some(limit) => println!("  Record Cap: {limit}"),
            None => println!("  Record Cap: none"),
        }

        match &config.reports {
            Some(reports) => {
                println!("  Reports: {}", reports.base_url);
                println!("  Marketplaces: {:?}", reports.marketplace_ids);
                println!(
                    "  Report Windows: {} day(s), poll every {}s, {}s after each create",
                    reports.window_days,
                    reports.poll_interval_seconds,
                    reports.creation_delay_seconds
                );
            }
            None => println!("  Reports: not configured"),
        }

        if let Some(pg) = &config.postgresql {
            println!(
                "  PostgreSQL: {}",
                connection_string_safe(pg.connection_string.expose_secret().as_str())
            );
            println!("  Max Connections: {}", pg.max_connections);
        }
        println!();

        Ok(0)
    }
}
