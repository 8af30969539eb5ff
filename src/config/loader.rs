//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::BazaarConfig;
use super::secret::secret_string;
use crate::domain::errors::BazaarError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`BazaarConfig`]
/// 4. Applies environment variable overrides (`BAZAAR_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file is missing or unreadable, a referenced
/// environment variable is unset, parsing fails, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use bazaar::config::loader::load_config;
///
/// let config = load_config("bazaar.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BazaarConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BazaarError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BazaarError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: BazaarConfig = toml::from_str(&contents)
        .map_err(|e| BazaarError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        BazaarError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced environment variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BazaarError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BazaarError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Parses a numeric override, failing loudly on malformed values
fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        BazaarError::Configuration(format!("Invalid value for {name}: '{value}'"))
    })
}

/// Applies environment variable overrides using the `BAZAAR_*` prefix
///
/// Environment variables follow the pattern `BAZAAR_<SECTION>_<KEY>`, for example
/// `BAZAAR_MARKETPLACE_APP_SECRET` or `BAZAAR_FETCH_MAX_WORKERS`.
fn apply_env_overrides(config: &mut BazaarConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("BAZAAR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("BAZAAR_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Marketplace overrides
    if let Ok(val) = std::env::var("BAZAAR_MARKETPLACE_BASE_URL") {
        config.marketplace.base_url = val;
    }
    if let Ok(val) = std::env::var("BAZAAR_MARKETPLACE_APP_KEY") {
        config.marketplace.app_key = val;
    }
    if let Ok(val) = std::env::var("BAZAAR_MARKETPLACE_APP_SECRET") {
        config.marketplace.app_secret = secret_string(val);
    }
    if let Ok(val) = std::env::var("BAZAAR_MARKETPLACE_ACCESS_TOKEN") {
        config.marketplace.access_token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("BAZAAR_MARKETPLACE_RETRY_MAX_ATTEMPTS") {
        config.marketplace.retry.max_attempts =
            parse_override("BAZAAR_MARKETPLACE_RETRY_MAX_ATTEMPTS", &val)?;
    }

    // Fetch overrides
    if let Ok(val) = std::env::var("BAZAAR_FETCH_MAX_WORKERS") {
        config.fetch.max_workers = parse_override("BAZAAR_FETCH_MAX_WORKERS", &val)?;
    }
    if let Ok(val) = std::env::var("BAZAAR_FETCH_MAX_LIMIT") {
        config.fetch.max_limit = if val.trim().is_empty() {
            None
        } else {
            Some(parse_override("BAZAAR_FETCH_MAX_LIMIT", &val)?)
        };
    }
    if let Ok(val) = std::env::var("BAZAAR_FETCH_PAGE_SIZE") {
        config.fetch.page_size = parse_override("BAZAAR_FETCH_PAGE_SIZE", &val)?;
    }

    // Reports overrides (only if reports are configured)
    if let Some(ref mut reports) = config.reports {
        if let Ok(val) = std::env::var("BAZAAR_REPORTS_ACCESS_TOKEN") {
            reports.access_token = secret_string(val);
        }
        if let Ok(val) = std::env::var("BAZAAR_REPORTS_PRICING_HISTORY") {
            reports.pricing_history = parse_override("BAZAAR_REPORTS_PRICING_HISTORY", &val)?;
        }
        if let Ok(val) = std::env::var("BAZAAR_REPORTS_WINDOW_DAYS") {
            reports.window_days = parse_override("BAZAAR_REPORTS_WINDOW_DAYS", &val)?;
        }
        if let Ok(val) = std::env::var("BAZAAR_REPORTS_POLL_INTERVAL_SECONDS") {
            reports.poll_interval_seconds =
                parse_override("BAZAAR_REPORTS_POLL_INTERVAL_SECONDS", &val)?;
        }
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("BAZAAR_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("BAZAAR_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_override("BAZAAR_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("BAZAAR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("BAZAAR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
