//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "bazaar.toml")]
    pub output: String,

    /// Include the optional sections with example values
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Bazaar configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - BAZAAR_APP_KEY, BAZAAR_APP_SECRET, BAZAAR_ACCESS_TOKEN");
                println!("     - BAZAAR_PG_CONNECTION (unless dry_run = true)");
                println!("  3. Validate configuration: bazaar validate-config");
                println!("  4. Run an ingest: bazaar pages orders --start 2025-01-01 --end 2025-01-31");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Bazaar Configuration File
# Marketplace ingestion pipeline

[application]
log_level = "info"
dry_run = false

[marketplace]
base_url = "https://gw.open.1688.com/openapi"
app_key = "${BAZAAR_APP_KEY}"
app_secret = "${BAZAAR_APP_SECRET}"
access_token = "${BAZAAR_ACCESS_TOKEN}"

[fetch]
max_workers = 5
page_size = 50

[postgresql]
connection_string = "${BAZAAR_PG_CONNECTION}"
max_connections = 10
ssl_mode = "prefer"

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with every section and example values
    fn generate_config_with_examples() -> String {
        r#"# Bazaar Configuration File
# Marketplace ingestion pipeline
#
# Values of the form ${VAR} are read from the environment (or a .env file).
# Any key can also be overridden with BAZAAR_<SECTION>_<KEY>, e.g.
# BAZAAR_FETCH_MAX_WORKERS=8 or BAZAAR_FETCH_MAX_LIMIT=1000.

[application]
# trace, debug, info, warn, error
log_level = "info"
# true writes to an in-memory sink and makes [postgresql] optional
dry_run = false

[marketplace]
# Gateway base URL; requests go to {base_url}/param2/{version}/{api}/{app_key}
base_url = "https://gw.open.1688.com/openapi"
app_key = "${BAZAAR_APP_KEY}"
app_secret = "${BAZAAR_APP_SECRET}"
access_token = "${BAZAAR_ACCESS_TOKEN}"
timeout_seconds = 15

[marketplace.retry]
# Delay before retry n is backoff_base^n * backoff_unit_ms, capped at max_delay_ms
max_attempts = 3
backoff_base = 2.0
backoff_unit_ms = 1000
max_delay_ms = 60000

[fetch]
# Concurrent page/ID calls (1-64)
max_workers = 5
page_size = 50
# Global record cap for page-based fetches
# max_limit = 1000
# List key used when a response's result is an object
records_key = "opOrderRefundModels"

[reports]
base_url = "https://sellingpartnerapi-eu.amazon.com"
access_token = "${BAZAAR_SP_ACCESS_TOKEN}"
marketplace_ids = ["A2VIGQ35RCS4UG"]
poll_interval_seconds = 15
# Pause after each create-report call
creation_delay_seconds = 50
window_days = 30
timeout_seconds = 30
# Append competitive pricing snapshots instead of replacing the previous one
pricing_history = false

[postgresql]
connection_string = "${BAZAAR_PG_CONNECTION}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60
# disable, prefer, require, verify-ca, verify-full
ssl_mode = "prefer"

[logging]
local_enabled = true
local_path = "./logs"
# daily, hourly, never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "bazaar.toml".to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.output, "bazaar.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[application]"));
        assert!(config.contains("[marketplace]"));
        assert!(config.contains("[postgresql]"));
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("[reports]"));
        assert!(config.contains("creation_delay_seconds"));
        assert!(config.contains("[marketplace.retry]"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = InitArgs::generate_config_with_examples();
        let parsed: toml::Value = toml::from_str(&config).unwrap();
        assert_eq!(parsed["fetch"]["max_workers"].as_integer(), Some(5));
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bazaar.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_str().unwrap().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
    }
}
